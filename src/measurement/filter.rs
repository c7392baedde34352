// Analysis filters and heatmap intensity

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::geojson::Feature;
use super::{NoiseMeasurement, NoiseSource};

/// Named hour-of-day windows, evaluated in local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// 08:00-10:00
    PeakMorning,
    /// 10:00-13:00
    InterMorning,
    /// 13:00-15:00
    PeakNoon,
    /// 15:00-19:00
    InterAfternoon,
    /// 19:00-22:00
    PeakEvening,
    /// 22:00-08:00
    Night,
}

impl TimeOfDay {
    pub fn contains_hour(&self, hour: u32) -> bool {
        match self {
            TimeOfDay::PeakMorning => (8..10).contains(&hour),
            TimeOfDay::InterMorning => (10..13).contains(&hour),
            TimeOfDay::PeakNoon => (13..15).contains(&hour),
            TimeOfDay::InterAfternoon => (15..19).contains(&hour),
            TimeOfDay::PeakEvening => (19..22).contains(&hour),
            TimeOfDay::Night => hour >= 22 || hour < 8,
        }
    }

    /// The window an hour falls into; every hour belongs to exactly one
    pub fn of_hour(hour: u32) -> Self {
        [
            TimeOfDay::PeakMorning,
            TimeOfDay::InterMorning,
            TimeOfDay::PeakNoon,
            TimeOfDay::InterAfternoon,
            TimeOfDay::PeakEvening,
        ]
        .into_iter()
        .find(|window| window.contains_hour(hour))
        .unwrap_or(TimeOfDay::Night)
    }
}

/// Conjunction of optional criteria; an empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementFilter {
    #[serde(default)]
    pub source: Option<NoiseSource>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
    /// Offset of the local clock used for `time_of_day`, in seconds east of UTC
    #[serde(default)]
    pub utc_offset_secs: i32,
}

impl MeasurementFilter {
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.from.is_none()
            && self.until.is_none()
            && self.time_of_day.is_none()
    }

    fn local_hour(&self, at: DateTime<Utc>) -> u32 {
        // Out-of-range offsets fall back to UTC
        match FixedOffset::east_opt(self.utc_offset_secs) {
            Some(offset) => at.with_timezone(&offset).hour(),
            None => at.hour(),
        }
    }

    fn matches_parts(&self, source: Option<NoiseSource>, recorded_at: Option<DateTime<Utc>>) -> bool {
        if let Some(wanted) = self.source {
            if source != Some(wanted) {
                return false;
            }
        }

        let time_criteria = self.from.is_some() || self.until.is_some() || self.time_of_day.is_some();
        let Some(at) = recorded_at else {
            return !time_criteria;
        };

        if self.from.is_some_and(|from| at < from) || self.until.is_some_and(|until| at > until) {
            return false;
        }

        self.time_of_day
            .map_or(true, |window| window.contains_hour(self.local_hour(at)))
    }

    pub fn matches(&self, measurement: &NoiseMeasurement) -> bool {
        self.matches_parts(Some(measurement.source), Some(measurement.recorded_at))
    }

    pub fn matches_feature(&self, feature: &Feature) -> bool {
        self.matches_parts(feature.source(), feature.properties.rec_time)
    }
}

/// Weight of a measurement in the density heatmap
///
/// 40 dB and below map to 0.1, 100 dB and above to 1.0.
pub fn heat_intensity(decibels: f64) -> f64 {
    if !decibels.is_finite() {
        return 0.1;
    }
    ((decibels - 40.0) / 60.0).clamp(0.1, 1.0)
}
