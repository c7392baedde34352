// Session module - timed, calibrated noise recordings
//
// A session acquires the microphone, snapshots the calibration offset,
// collects one reading per tick until the configured duration is reached
// and reduces the readings to a single energy-averaged level.

pub mod controller;
pub mod reduce;

pub use controller::{
    CancelToken, SessionController, SessionProgress, SessionResult, SessionState,
};
pub use reduce::power_average;
