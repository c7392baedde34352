// Submission validation: wire body -> accepted measurement
//
// Checks run in a fixed order so the first failure is the one reported:
// required fields, decibel range, coordinates, geofence, source, annoyance.

use serde::{Deserialize, Serialize};

use super::NoiseSource;
use crate::config::ServerConfig;
use crate::error::MeasurementError;

/// Body of `POST /api/noise`
///
/// Every field is optional on the wire so that a missing field is reported
/// as such rather than as a generic parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseSubmission {
    #[serde(default)]
    pub noise_db_val: Option<f64>,
    #[serde(default)]
    pub noise_source: Option<String>,
    #[serde(default)]
    pub annoyance_level: Option<i64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A submission that passed validation, ready to store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewMeasurement {
    pub decibels: f64,
    pub source: NoiseSource,
    pub annoyance_level: Option<u8>,
    pub latitude: f64,
    pub longitude: f64,
}

fn required(value: Option<f64>, field: &'static str) -> Result<f64, MeasurementError> {
    value
        .filter(|v| v.is_finite())
        .ok_or(MeasurementError::MissingField { field })
}

impl NoiseSubmission {
    pub fn new(
        decibels: f64,
        source: NoiseSource,
        annoyance_level: Option<u8>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            noise_db_val: Some(decibels),
            noise_source: Some(source.as_str().to_string()),
            annoyance_level: annoyance_level.map(i64::from),
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    /// Validate against the server's accepted range and service area
    ///
    /// A missing source is recorded as [`NoiseSource::Other`]; a missing
    /// annoyance level stays unset.
    pub fn validate(&self, rules: &ServerConfig) -> Result<NewMeasurement, MeasurementError> {
        let decibels = required(self.noise_db_val, "noise_db_val")?;
        let latitude = required(self.latitude, "latitude")?;
        let longitude = required(self.longitude, "longitude")?;

        if decibels < rules.noise_min_db || decibels > rules.noise_max_db {
            return Err(MeasurementError::OutOfBounds {
                value: decibels,
                min: rules.noise_min_db,
                max: rules.noise_max_db,
            });
        }

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(MeasurementError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        if !rules.service_area.contains(latitude, longitude) {
            return Err(MeasurementError::OutsideServiceArea {
                latitude,
                longitude,
            });
        }

        let source = match self.noise_source.as_deref() {
            None | Some("") => NoiseSource::Other,
            Some(raw) => raw.parse()?,
        };

        let annoyance_level = match self.annoyance_level {
            None => None,
            Some(level @ 1..=5) => Some(level as u8),
            Some(level) => return Err(MeasurementError::InvalidAnnoyance { level }),
        };

        Ok(NewMeasurement {
            decibels,
            source,
            annoyance_level,
            latitude,
            longitude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ServerConfig {
        ServerConfig::default()
    }

    fn valid() -> NoiseSubmission {
        NoiseSubmission::new(45.0, NoiseSource::Traffic, Some(3), 39.10, 26.55)
    }

    #[test]
    fn test_valid_submission() {
        let accepted = valid().validate(&rules()).unwrap();
        assert_eq!(accepted.decibels, 45.0);
        assert_eq!(accepted.source, NoiseSource::Traffic);
        assert_eq!(accepted.annoyance_level, Some(3));
    }

    #[test]
    fn test_missing_fields() {
        let mut body = valid();
        body.latitude = None;
        assert_eq!(
            body.validate(&rules()),
            Err(MeasurementError::MissingField { field: "latitude" })
        );

        let empty = NoiseSubmission::default();
        assert_eq!(
            empty.validate(&rules()),
            Err(MeasurementError::MissingField {
                field: "noise_db_val"
            })
        );
    }

    #[test]
    fn test_decibel_range_is_inclusive() {
        let mut body = valid();
        for db in [30.0, 130.0] {
            body.noise_db_val = Some(db);
            assert!(body.validate(&rules()).is_ok());
        }

        body.noise_db_val = Some(20.0);
        let err = body.validate(&rules()).unwrap_err();
        assert_eq!(err.title(), "Invalid noise value");
        assert!(matches!(err, MeasurementError::OutOfBounds { .. }));
    }

    #[test]
    fn test_range_checked_before_geofence() {
        let mut body = valid();
        body.noise_db_val = Some(150.0);
        body.latitude = Some(10.0);
        assert!(matches!(
            body.validate(&rules()),
            Err(MeasurementError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_outside_service_area() {
        let mut body = valid();
        body.latitude = Some(10.0);
        assert!(matches!(
            body.validate(&rules()),
            Err(MeasurementError::OutsideServiceArea { .. })
        ));
    }

    #[test]
    fn test_invalid_coordinates() {
        let mut body = valid();
        body.longitude = Some(400.0);
        assert!(matches!(
            body.validate(&rules()),
            Err(MeasurementError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_source_and_annoyance() {
        let mut body = valid();
        body.noise_source = None;
        body.annoyance_level = None;
        let accepted = body.validate(&rules()).unwrap();
        assert_eq!(accepted.source, NoiseSource::Other);
        assert_eq!(accepted.annoyance_level, None);

        body.annoyance_level = Some(6);
        assert_eq!(
            body.validate(&rules()),
            Err(MeasurementError::InvalidAnnoyance { level: 6 })
        );

        body.annoyance_level = Some(2);
        body.noise_source = Some("aliens".to_string());
        assert!(matches!(
            body.validate(&rules()),
            Err(MeasurementError::UnknownSource { .. })
        ));
    }
}
