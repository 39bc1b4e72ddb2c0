//! Parameters structure for the swerve kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::NUM_MODULES;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the swerve kinematics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// The position of each module's steer axis in the robot body frame (x forward, y left), in
    /// front-left, front-right, back-left, back-right order.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub module_pos_m_rb: [[f64; 2]; NUM_MODULES],

    // ---- CAPABILITIES ----
    /// Maximum linear speed any module can be driven at.
    ///
    /// Units: meters/second
    pub max_module_speed_ms: f64,
}
