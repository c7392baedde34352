//! Configuration management for the measurement core and API
//!
//! This module provides runtime configuration loading from JSON files,
//! so metering constants, IDW tuning and the service area can be adjusted
//! without recompilation. Every section falls back to its defaults when
//! absent from the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::idw::gradient::{GradientStop, Rgba};
use crate::measurement::GeoBounds;

/// Default location of the configuration file on desktop platforms
pub const DEFAULT_CONFIG_PATH: &str = "assets/noise_watch.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub meter: MeterConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub idw: IdwConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Loudness estimator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Sampling tick period in milliseconds
    pub tick_ms: u64,
    /// Exponential smoothing factor applied to the previous value, in [0, 1)
    pub smoothing_alpha: f64,
    /// Initial smoothed value before the first tick
    pub baseline_db: f64,
    /// Value used for silent frames and lower clamp bound
    pub floor_db: f64,
    /// Upper clamp bound
    pub ceiling_db: f64,
    /// Size of each pooled capture buffer in samples
    pub block_size: usize,
    /// Number of pre-allocated capture buffers
    pub buffer_pool_size: usize,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            smoothing_alpha: 0.8,
            baseline_db: 40.0,
            floor_db: 10.0,
            ceiling_db: 130.0,
            block_size: 2048,
            buffer_pool_size: 16,
        }
    }
}

/// Recording session parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capture duration in milliseconds
    pub duration_ms: u64,
    /// Shortest duration accepted from configuration
    pub min_duration_ms: u64,
    /// Longest duration accepted from configuration
    pub max_duration_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_ms: 10_000,
            min_duration_ms: 10_000,
            max_duration_ms: 60_000,
        }
    }
}

/// Microphone calibration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Offset used until the user saves one
    pub default_offset: i32,
    /// JSON file backing the calibration store
    pub store_path: String,
    /// Lower edge of the quiet-room target band shown while calibrating
    pub quiet_target_min_db: f64,
    /// Upper edge of the quiet-room target band shown while calibrating
    pub quiet_target_max_db: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            default_offset: crate::calibration::DEFAULT_OFFSET,
            store_path: "noise_watch_calibration.json".to_string(),
            quiet_target_min_db: 30.0,
            quiet_target_max_db: 35.0,
        }
    }
}

/// Inverse-distance-weighting raster parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwConfig {
    /// Cell edge length in pixels
    pub cell_size: u32,
    /// Distance decay exponent
    pub exponent: f64,
    /// Value mapped to the start of the gradient
    pub min_value: f64,
    /// Value mapped to the end of the gradient
    pub max_value: f64,
    /// Points further than this (in degrees) do not influence a cell
    pub max_distance: f64,
    /// Fill opacity of painted cells
    pub opacity: f64,
    /// Values above this get `high_boost`
    pub high_threshold: f64,
    /// Values above this (and not above `high_threshold`) get `mid_boost`
    pub mid_threshold: f64,
    pub high_boost: f64,
    pub mid_boost: f64,
    /// Interpolated values never drop below `max_local * floor_factor`
    pub floor_factor: f64,
    /// Ordered colour stops over the normalized range
    pub gradient: Vec<GradientStop>,
}

impl Default for IdwConfig {
    fn default() -> Self {
        Self {
            cell_size: 3,
            exponent: 2.0,
            min_value: 30.0,
            max_value: 100.0,
            max_distance: 0.0015,
            opacity: 0.5,
            high_threshold: 75.0,
            mid_threshold: 60.0,
            high_boost: 4.0,
            mid_boost: 2.0,
            floor_factor: 0.85,
            gradient: vec![
                GradientStop::new(0.0, Rgba::rgb(0x00, 0xff, 0x00)),
                GradientStop::new(0.5, Rgba::rgb(0xff, 0xff, 0x00)),
                GradientStop::new(1.0, Rgba::rgb(0xff, 0x00, 0x00)),
            ],
        }
    }
}

/// Submission/retrieval API parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API binds to
    pub bind_addr: String,
    /// Lowest accepted decibel value
    pub noise_min_db: f64,
    /// Highest accepted decibel value
    pub noise_max_db: f64,
    /// Geofence for accepted submissions
    pub service_area: GeoBounds,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            noise_min_db: 30.0,
            noise_max_db: 130.0,
            service_area: GeoBounds::new(39.05, 26.50, 39.16, 26.62),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing,
    /// unparsable or fails validation.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => match config.validate() {
                    Ok(()) => {
                        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                        config
                    }
                    Err(err) => {
                        log::warn!(
                            "[Config] Invalid configuration in {:?}: {}. Using defaults.",
                            path.as_ref(),
                            err
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> anyhow::Result<()> {
        let meter = &self.meter;
        if !(0.0..1.0).contains(&meter.smoothing_alpha) {
            anyhow::bail!(
                "meter.smoothing_alpha must be in [0, 1), got {}",
                meter.smoothing_alpha
            );
        }
        if meter.tick_ms == 0 {
            anyhow::bail!("meter.tick_ms must be greater than 0");
        }
        if meter.block_size == 0 || meter.buffer_pool_size == 0 {
            anyhow::bail!("meter.block_size and meter.buffer_pool_size must be greater than 0");
        }
        if meter.floor_db >= meter.ceiling_db {
            anyhow::bail!(
                "meter.floor_db ({}) must be below meter.ceiling_db ({})",
                meter.floor_db,
                meter.ceiling_db
            );
        }

        let session = &self.session;
        if session.duration_ms < session.min_duration_ms
            || session.duration_ms > session.max_duration_ms
        {
            anyhow::bail!(
                "session.duration_ms {} outside [{}, {}]",
                session.duration_ms,
                session.min_duration_ms,
                session.max_duration_ms
            );
        }

        let idw = &self.idw;
        if idw.cell_size == 0 {
            anyhow::bail!("idw.cell_size must be greater than 0");
        }
        if idw.min_value >= idw.max_value {
            anyhow::bail!(
                "idw.min_value ({}) must be below idw.max_value ({})",
                idw.min_value,
                idw.max_value
            );
        }
        if idw.gradient.is_empty() {
            anyhow::bail!("idw.gradient needs at least one stop");
        }

        if self.server.noise_min_db >= self.server.noise_max_db {
            anyhow::bail!("server.noise_min_db must be below server.noise_max_db");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.meter.tick_ms, 100);
        assert_eq!(config.meter.smoothing_alpha, 0.8);
        assert_eq!(config.session.duration_ms, 10_000);
        assert_eq!(config.calibration.default_offset, 90);
        assert_eq!(config.idw.cell_size, 3);
        assert_eq!(config.idw.floor_factor, 0.85);
        assert_eq!(config.server.noise_min_db, 30.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.idw, config.idw);
        assert_eq!(parsed.meter.block_size, config.meter.block_size);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "meter": { "smoothing_alpha": 0.5 } }"#).unwrap();

        assert_eq!(parsed.meter.smoothing_alpha, 0.5);
        assert_eq!(parsed.meter.tick_ms, 100);
        assert_eq!(parsed.idw.exponent, 2.0);
    }

    #[test]
    fn test_validate_rejects_bad_alpha() {
        let mut config = AppConfig::default();
        config.meter.smoothing_alpha = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duration_outside_window() {
        let mut config = AppConfig::default();
        config.session.duration_ms = 90_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/noise_watch.json");
        assert_eq!(config.meter.tick_ms, 100);
    }

    #[test]
    fn test_shipped_asset_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/noise_watch.json");
        let contents = fs::read_to_string(path).unwrap();
        let parsed: AppConfig = serde_json::from_str(&contents).unwrap();

        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.idw, IdwConfig::default());
        assert_eq!(parsed.server.service_area, ServerConfig::default().service_area);
    }
}
