//! Parameters structure for the pose estimator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the pose estimator.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Length of the odometry history kept for latency compensation. Measurements older than
    /// this are rejected.
    ///
    /// Units: seconds
    pub history_window_s: f64,

    /// Standard deviation of the odometry estimate in x, y and heading.
    ///
    /// Units: meters, meters, radians
    pub state_std_dev: [f64; 3],

    /// Standard deviation of a vision measurement of a tag at zero distance, in x, y and heading.
    ///
    /// Units: meters, meters, radians
    pub vision_std_dev: [f64; 3],

    /// Growth of the vision standard deviation with tag distance, which is scaled by
    /// `1 + gain * distance^2`.
    ///
    /// Units: 1/meters^2
    pub vision_distance_gain: f64,

    /// Time constant of the decay of a measurement's weight with its age.
    ///
    /// Units: seconds
    pub age_decay_s: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            history_window_s: 1.5,
            state_std_dev: [0.1, 0.1, 0.1],
            vision_std_dev: [0.9, 0.9, 0.9],
            vision_distance_gain: 0.1,
            age_decay_s: 0.5,
        }
    }
}
