// GeoJSON wire format of the retrieval API
//
// Parsing is lenient at the feature level: a feature that does not parse is
// dropped with a warning instead of failing the whole collection, and
// `noise_db_val` accepts numeric strings as emitted by SQL numeric columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{MeasurementPoint, NoiseMeasurement, NoiseSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "skip_malformed_features")]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: FeatureProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]` for points
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub report_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub noise_db_val: Option<f64>,
    #[serde(default)]
    pub noise_source: Option<String>,
    #[serde(default)]
    pub annoyance_level: Option<u8>,
    #[serde(default)]
    pub rec_time: Option<DateTime<Utc>>,
}

fn skip_malformed_features<'de, D>(deserializer: D) -> Result<Vec<Feature>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(feature) => Some(feature),
            Err(err) => {
                tracing::warn!("[GeoJson] Skipping malformed feature #{}: {}", index, err);
                None
            }
        })
        .collect())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

impl Feature {
    pub fn from_measurement(measurement: &NoiseMeasurement) -> Self {
        Self {
            kind: "Feature".to_string(),
            geometry: Some(Geometry {
                kind: "Point".to_string(),
                coordinates: vec![measurement.longitude, measurement.latitude],
            }),
            properties: FeatureProperties {
                report_id: Some(measurement.id),
                noise_db_val: Some(measurement.decibels),
                noise_source: Some(measurement.source.as_str().to_string()),
                annoyance_level: measurement.annoyance_level,
                rec_time: Some(measurement.recorded_at),
            },
        }
    }

    /// `(latitude, longitude)` of a well-formed point geometry
    pub fn position(&self) -> Option<(f64, f64)> {
        let geometry = self.geometry.as_ref()?;
        if geometry.kind != "Point" {
            return None;
        }
        match geometry.coordinates.as_slice() {
            [lon, lat, ..] if lat.is_finite() && lon.is_finite() => Some((*lat, *lon)),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<NoiseSource> {
        self.properties.noise_source.as_deref()?.parse().ok()
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            features,
        }
    }

    pub fn from_measurements<'a>(measurements: impl IntoIterator<Item = &'a NoiseMeasurement>) -> Self {
        Self::new(measurements.into_iter().map(Feature::from_measurement).collect())
    }
}

/// Turn features into interpolation inputs
///
/// Features without a point position or a finite decibel value are skipped.
pub fn extract_points(collection: &FeatureCollection) -> Vec<MeasurementPoint> {
    collection
        .features
        .iter()
        .filter_map(|feature| {
            let (latitude, longitude) = feature.position()?;
            let value = feature.properties.noise_db_val.filter(|v| v.is_finite())?;
            Some(MeasurementPoint::new(latitude, longitude, value))
        })
        .collect()
}
