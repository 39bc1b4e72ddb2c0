//! # Drive control module
//!
//! DriveCtrl shapes the raw driver input into a chassis velocity demand. Translation is
//! deadbanded on its magnitude so diagonal input isn't distorted, both translation and rotation
//! are squared for finer control at low stick deflection, and a POV target overrides the rotation
//! axis with the profiled heading controller.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod heading_ctrl;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::kinematics::{ChassisVelocity, NUM_MODULES};
use comms_if::tc::drive::DriverInput;

pub use heading_ctrl::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Demand produced by DriveCtrl for the drivetrain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DriveDemand {
    /// Drive at a robot relative chassis velocity.
    ///
    /// Modules with a `false` enable are commanded to zero speed and hold their angle.
    Velocity {
        vel: ChassisVelocity,
        enables: [bool; NUM_MODULES],
    },

    /// Lock the modules into the cross formation.
    Cross,
}

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Could not load the DriveCtrl parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Recieved an invalid driver input: {0:?}")]
    InvalidInput(DriverInput),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveDemand {
    /// Zero velocity with all modules enabled.
    pub fn stop() -> Self {
        DriveDemand::Velocity {
            vel: ChassisVelocity::zero(),
            enables: [true; NUM_MODULES],
        }
    }
}

impl Default for DriveDemand {
    fn default() -> Self {
        Self::stop()
    }
}
