//! # Swerve Executable Parameters
//!
//! This module provide parameters for the swerve executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{drive_io::Backend, loc::Pose2D};
use comms_if::tc::Alliance;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SwerveExecParams {
    /// Hardware driving the modules and gyro
    pub backend: Backend,

    /// Alliance to assume at startup. If not given the field origin is undetermined until a
    /// `SET_ALLIANCE` telecommand arrives, and the blue origin is used.
    #[serde(default)]
    pub alliance: Option<Alliance>,

    /// Pose the robot is placed at on startup
    #[serde(default)]
    pub start_pose: Pose2D,

    /// If false the vision coprocessor is not connected and the robot runs on odometry only
    #[serde(default = "default_true")]
    pub vision_enabled: bool,
}

fn default_true() -> bool {
    true
}
