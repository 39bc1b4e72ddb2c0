//! # Drive telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// POV value meaning no target heading has been selected.
///
/// Any value outside [0, 360) is treated the same way.
pub const POV_UNSET: f64 = -1.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Raw driver input as read from the driver station.
///
/// Axes follow the field convention: `vx` positive away from the driver station wall, `vy`
/// positive to the driver's left, and `omega` positive counter-clockwise seen from above.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverInput {
    /// Normalised X translation axis, [-1, 1]
    pub vx: f64,

    /// Normalised Y translation axis, [-1, 1]
    pub vy: f64,

    /// Normalised rotation axis, [-1, 1]
    pub omega: f64,

    /// Target heading from the POV hat in degrees, or [`POV_UNSET`].
    pub pov_deg: f64,

    /// If true translation is interpreted in the field frame, otherwise in the robot frame.
    pub field_oriented: bool,

    /// If true the modules are locked into the defensive cross formation.
    pub cross: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DriverInput {
    fn default() -> Self {
        Self {
            vx: 0.0,
            vy: 0.0,
            omega: 0.0,
            pov_deg: POV_UNSET,
            field_oriented: true,
            cross: false,
        }
    }
}

impl DriverInput {
    /// Get the target heading in degrees, if one is set.
    ///
    /// Values outside [0, 360), including NaN, are not a heading.
    pub fn target_heading_deg(&self) -> Option<f64> {
        if (0.0..360.0).contains(&self.pov_deg) {
            Some(self.pov_deg)
        } else {
            None
        }
    }
}
