//! # Localisation module
//!
//! This module provides the robot's estimate of where it is on the field. The [`PoseEstimator`]
//! is advanced every cycle by wheel odometry and the gyro, and corrected by admitted vision
//! measurements.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod pose_est;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
pub use params::*;
pub use pose_est::*;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose of the robot centre on the field.
///
/// The field frame has its origin at the blue alliance corner, x along the field length and y
/// along the width. Heading is measured anticlockwise from the x axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Heading in (-pi, pi].
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A robot pose reconstructed from a single tag detection, admitted for fusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisionMeasurement {
    /// The measured robot pose
    pub pose: Pose2D,

    /// Capture time of the detection, on the same clock as the estimator.
    ///
    /// Units: seconds
    pub timestamp_s: f64,

    /// Distance from the camera to the tag.
    ///
    /// Units: meters
    pub tag_distance_m: f64,

    /// Index of the camera that made the detection
    pub cam_idx: usize,

    /// Id of the detected tag
    pub tag_id: i64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2D {
    /// Create a new pose, wrapping the heading into (-pi, pi].
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            x_m,
            y_m,
            heading_rad: wrap_pi(heading_rad),
        }
    }

    /// Position part of the pose.
    pub fn translation(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }

    /// Euclidean distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose2D) -> f64 {
        (self.translation() - other.translation()).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x_m.is_finite() && self.y_m.is_finite() && self.heading_rad.is_finite()
    }
}

impl VisionMeasurement {
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.timestamp_s.is_finite() && self.tag_distance_m.is_finite()
    }
}
