//! Shared measurement data contract.
//!
//! Measurements flow from a finished recording session through the
//! submission API, come back out of the retrieval API as GeoJSON and end up
//! as [`MeasurementPoint`]s for the IDW engine. Everything here is plain data
//! plus validation; storage lives behind [`MeasurementRepository`].

pub mod filter;
pub mod geojson;
pub mod repository;
pub mod validation;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MeasurementError;

pub use filter::{heat_intensity, MeasurementFilter, TimeOfDay};
pub use geojson::{extract_points, Feature, FeatureCollection};
pub use repository::{Clock, InMemoryRepository, MeasurementRepository, SystemClock};
pub use validation::{NewMeasurement, NoiseSubmission};

/// Inclusive latitude/longitude rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.south
            && latitude <= self.north
            && longitude >= self.west
            && longitude <= self.east
    }
}

/// Reported cause of the noise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseSource {
    Nature,
    Traffic,
    Construction,
    Music,
    Human,
    Industrial,
    Other,
}

impl NoiseSource {
    pub const ALL: [NoiseSource; 7] = [
        NoiseSource::Nature,
        NoiseSource::Traffic,
        NoiseSource::Construction,
        NoiseSource::Music,
        NoiseSource::Human,
        NoiseSource::Industrial,
        NoiseSource::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseSource::Nature => "nature",
            NoiseSource::Traffic => "traffic",
            NoiseSource::Construction => "construction",
            NoiseSource::Music => "music",
            NoiseSource::Human => "human",
            NoiseSource::Industrial => "industrial",
            NoiseSource::Other => "other",
        }
    }
}

impl fmt::Display for NoiseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoiseSource {
    type Err = MeasurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        NoiseSource::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MeasurementError::UnknownSource {
                source: s.to_string(),
            })
    }
}

/// Coarse loudness band used for point markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseBand {
    Low,
    High,
    Dangerous,
}

impl NoiseBand {
    pub fn classify(decibels: f64) -> Self {
        if decibels > 80.0 {
            NoiseBand::Dangerous
        } else if decibels > 65.0 {
            NoiseBand::High
        } else {
            NoiseBand::Low
        }
    }
}

/// A stored, accepted measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseMeasurement {
    pub id: u64,
    pub decibels: f64,
    pub source: NoiseSource,
    pub annoyance_level: Option<u8>,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

impl NoiseMeasurement {
    pub fn point(&self) -> MeasurementPoint {
        MeasurementPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            value: self.decibels,
        }
    }
}

/// Input to the IDW engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
}

impl MeasurementPoint {
    pub fn new(latitude: f64, longitude: f64, value: f64) -> Self {
        Self {
            latitude,
            longitude,
            value,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite() && self.value.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_inclusive() {
        let area = GeoBounds::new(39.05, 26.50, 39.16, 26.62);
        assert!(area.contains(39.10, 26.55));
        assert!(area.contains(39.05, 26.62));
        assert!(!area.contains(10.0, 26.55));
        assert!(!area.contains(39.10, 26.63));
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!("traffic".parse::<NoiseSource>().unwrap(), NoiseSource::Traffic);
        assert_eq!(" Music ".parse::<NoiseSource>().unwrap(), NoiseSource::Music);
        assert!(matches!(
            "jackhammer".parse::<NoiseSource>(),
            Err(MeasurementError::UnknownSource { .. })
        ));
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let json = serde_json::to_string(&NoiseSource::Construction).unwrap();
        assert_eq!(json, "\"construction\"");
    }

    #[test]
    fn test_noise_bands() {
        assert_eq!(NoiseBand::classify(50.0), NoiseBand::Low);
        assert_eq!(NoiseBand::classify(65.0), NoiseBand::Low);
        assert_eq!(NoiseBand::classify(70.0), NoiseBand::High);
        assert_eq!(NoiseBand::classify(80.5), NoiseBand::Dangerous);
    }
}
