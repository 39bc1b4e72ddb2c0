//! # Pose estimator
//!
//! The estimator owns the single fused pose of the robot. Every cycle it is advanced by
//! odometry: the measured module states give the robot relative chassis velocity, and the gyro
//! gives the heading. Vision measurements are blended in asynchronously, weighted by their
//! declared uncertainty and their age, against the odometry pose at the time the measurement was
//! captured.
//!
//! The gyro is authoritative for heading. The estimator keeps an offset between the gyro heading
//! and the field heading, so resets and heading corrections move the offset, never the gyro.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;
use std::collections::VecDeque;

use super::{Params, Pose2D, VisionMeasurement};
use crate::kinematics::{ModuleState, SwerveKinematics, NUM_MODULES};
use util::maths::{get_ang_dist_2pi, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Rotation below which the pose exponential uses its series expansion.
const SMALL_ANGLE_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fuses odometry and vision into a single pose estimate.
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    params: Params,

    kinematics: SwerveKinematics,

    pose: Pose2D,

    /// Field heading minus gyro heading
    heading_offset_rad: f64,

    last_gyro_rad: f64,

    history: VecDeque<PoseSample>,
}

/// A pose in the odometry history.
#[derive(Debug, Clone, Copy, Serialize)]
struct PoseSample {
    time_s: f64,
    pose: Pose2D,
}

/// The result of a vision correction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Correction {
    /// Gain applied to each of x, y and heading, in [0, 1].
    pub gain: [f64; 3],

    /// The shift applied to the pose.
    ///
    /// Units: meters, meters, radians
    pub shift: [f64; 3],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PoseEstError {
    #[error("Measurement is {age_s:.3} s old, older than the {window_s:.3} s history window")]
    MeasurementTooOld { age_s: f64, window_s: f64 },

    #[error("Measurement contains non-finite values: {0:?}")]
    NonFiniteMeasurement(VisionMeasurement),

    #[error("Odometry input contains non-finite values (gyro {gyro_rad}, dt {dt_s})")]
    NonFiniteOdometry { gyro_rad: f64, dt_s: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseEstimator {
    /// Create a new estimator at the origin.
    pub fn new(params: Params, kinematics: SwerveKinematics) -> Self {
        Self {
            params,
            kinematics,
            pose: Pose2D::default(),
            heading_offset_rad: 0.0,
            last_gyro_rad: 0.0,
            history: VecDeque::new(),
        }
    }

    /// Snapshot of the current estimate.
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    pub fn heading_offset_rad(&self) -> f64 {
        self.heading_offset_rad
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Advance the estimate by one cycle of odometry.
    ///
    /// `module_states` are the measured states over the cycle, `gyro_heading_rad` the gyro
    /// reading at the end of it, and `now_s` the time at the end of the cycle.
    pub fn advance(
        &mut self,
        module_states: &[ModuleState; NUM_MODULES],
        gyro_heading_rad: f64,
        dt_s: f64,
        now_s: f64,
    ) -> Result<Pose2D, PoseEstError> {
        if !gyro_heading_rad.is_finite() || !dt_s.is_finite() {
            return Err(PoseEstError::NonFiniteOdometry {
                gyro_rad: gyro_heading_rad,
                dt_s,
            });
        }

        let vel = self.kinematics.to_chassis_velocity(module_states);

        let new_heading = wrap_pi(gyro_heading_rad + self.heading_offset_rad);
        let dtheta = get_ang_dist_2pi(self.pose.heading_rad, new_heading);

        // Pose exponential of the twist over the cycle, in the robot frame at the cycle start
        let dx = vel.vx_ms * dt_s;
        let dy = vel.vy_ms * dt_s;
        let (s, c) = if dtheta.abs() < SMALL_ANGLE_RAD {
            (1.0 - dtheta * dtheta / 6.0, dtheta / 2.0)
        } else {
            (dtheta.sin() / dtheta, (1.0 - dtheta.cos()) / dtheta)
        };
        let lx = dx * s - dy * c;
        let ly = dx * c + dy * s;

        let (sh, ch) = self.pose.heading_rad.sin_cos();
        self.pose = Pose2D::new(
            self.pose.x_m + lx * ch - ly * sh,
            self.pose.y_m + lx * sh + ly * ch,
            new_heading,
        );
        self.last_gyro_rad = gyro_heading_rad;

        self.history.push_back(PoseSample {
            time_s: now_s,
            pose: self.pose,
        });
        while let Some(front) = self.history.front() {
            if now_s - front.time_s > self.params.history_window_s {
                self.history.pop_front();
            } else {
                break;
            }
        }

        Ok(self.pose)
    }

    /// Blend a vision measurement into the estimate.
    ///
    /// The measurement is compared with the odometry pose at its capture time, and the weighted
    /// difference is applied to the current pose and the whole history.
    pub fn correct(
        &mut self,
        measurement: &VisionMeasurement,
        now_s: f64,
    ) -> Result<Correction, PoseEstError> {
        if !measurement.is_finite() {
            return Err(PoseEstError::NonFiniteMeasurement(*measurement));
        }

        let age_s = (now_s - measurement.timestamp_s).max(0.0);
        if age_s > self.params.history_window_s {
            return Err(PoseEstError::MeasurementTooOld {
                age_s,
                window_s: self.params.history_window_s,
            });
        }

        let reference = self
            .sample_at(measurement.timestamp_s)
            .unwrap_or(self.pose);

        let gain = self.gains(measurement.tag_distance_m, age_s);
        let shift = [
            gain[0] * (measurement.pose.x_m - reference.x_m),
            gain[1] * (measurement.pose.y_m - reference.y_m),
            gain[2] * get_ang_dist_2pi(reference.heading_rad, measurement.pose.heading_rad),
        ];

        self.pose = shift_pose(&self.pose, &shift);
        self.heading_offset_rad = wrap_pi(self.heading_offset_rad + shift[2]);
        for sample in self.history.iter_mut() {
            sample.pose = shift_pose(&sample.pose, &shift);
        }

        trace!(
            "Vision correction from cam {} tag {}: gain {:?}, shift {:?}",
            measurement.cam_idx,
            measurement.tag_id,
            gain,
            shift
        );

        Ok(Correction { gain, shift })
    }

    /// Overwrite the estimate with a known pose.
    ///
    /// Used at the start of an autonomous routine. The history is cleared since it no longer
    /// relates to the new pose.
    pub fn reset_to(&mut self, pose: Pose2D) {
        self.pose = Pose2D::new(pose.x_m, pose.y_m, pose.heading_rad);
        self.heading_offset_rad = wrap_pi(self.pose.heading_rad - self.last_gyro_rad);
        self.history.clear();
    }

    /// Set the estimated heading after the gyro has been re-zeroed, keeping the position.
    pub fn reset_heading(&mut self, heading_rad: f64, gyro_heading_rad: f64) {
        self.last_gyro_rad = gyro_heading_rad;
        self.reset_to(Pose2D::new(self.pose.x_m, self.pose.y_m, heading_rad));
    }

    /// Per axis gain for a measurement of a tag at `distance_m`, `age_s` old.
    fn gains(&self, distance_m: f64, age_s: f64) -> [f64; 3] {
        let decay = if self.params.age_decay_s > 0.0 {
            (-age_s / self.params.age_decay_s).exp()
        } else {
            1.0
        };
        let scale = 1.0 + self.params.vision_distance_gain * distance_m * distance_m;

        let mut gain = [0.0; 3];
        for i in 0..3 {
            let q = self.params.state_std_dev[i].powi(2);
            let r = (self.params.vision_std_dev[i] * scale).powi(2);

            gain[i] = if q + r > 0.0 { decay * q / (q + r) } else { 0.0 };
        }

        gain
    }

    /// Odometry pose at the given time, interpolated between history samples.
    ///
    /// Times outside the history are clamped to its ends.
    fn sample_at(&self, time_s: f64) -> Option<Pose2D> {
        let first = self.history.front()?;
        let last = self.history.back()?;

        if time_s <= first.time_s {
            return Some(first.pose);
        }
        if time_s >= last.time_s {
            return Some(last.pose);
        }

        let idx = self.history.iter().position(|s| s.time_s > time_s)?;
        let s1 = self.history.get(idx)?;
        let s0 = self.history.get(idx.checked_sub(1)?)?;

        let frac = (time_s - s0.time_s) / (s1.time_s - s0.time_s);

        Some(Pose2D::new(
            s0.pose.x_m + frac * (s1.pose.x_m - s0.pose.x_m),
            s0.pose.y_m + frac * (s1.pose.y_m - s0.pose.y_m),
            s0.pose.heading_rad
                + frac * get_ang_dist_2pi(s0.pose.heading_rad, s1.pose.heading_rad),
        ))
    }
}

fn shift_pose(pose: &Pose2D, shift: &[f64; 3]) -> Pose2D {
    Pose2D::new(
        pose.x_m + shift[0],
        pose.y_m + shift[1],
        pose.heading_rad + shift[2],
    )
}
