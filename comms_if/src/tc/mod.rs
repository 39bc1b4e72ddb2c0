//! # Telecommand module
//!
//! This module provides the driver station telecommands, i.e. the instructions sent to the robot
//! from the driver station or from a script.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod drive;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
pub use drive::DriverInput;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand.
///
/// Serialised as `{"type": "DRIVE", "payload": {...}}`, with no payload for types which don't
/// carry any data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tc {
    /// Enable the robot, allowing the drivetrain to move.
    Enable,

    /// Disable the robot, stopping all modules.
    Disable,

    /// New driver input.
    Drive(DriverInput),

    /// Set the alliance the robot is playing for, which selects the field origin.
    SetAlliance(Alliance),

    /// Overwrite the estimated pose, used at the start of an autonomous routine.
    ResetPose {
        x_m: f64,
        y_m: f64,
        heading_rad: f64,
    },

    /// Re-zero the gyro so the current direction becomes heading zero.
    ZeroGyro,

    /// Diagnostic per-module enable flags, in front-left, front-right, back-left, back-right order.
    SetModuleEnable([bool; 4]),
}

/// The alliance the robot is playing for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alliance {
    Blue,
    Red,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }
}
