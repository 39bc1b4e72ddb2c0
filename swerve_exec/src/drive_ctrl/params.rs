//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Params {
    // ---- DRIVER INPUT ----
    /// Deadband applied to the translation magnitude and rotation axis, in normalised axis
    /// units.
    pub deadband: f64,

    /// Offset added to the POV angle to get the target field heading. A value of pi makes "up"
    /// on the POV face away from the driver station.
    ///
    /// Units: radians
    pub heading_offset_rad: f64,

    // ---- CAPABILITIES ----
    /// Chassis speed demanded at full stick.
    ///
    /// Units: meters/second
    pub max_linear_speed_ms: f64,

    /// Chassis rotation rate demanded at full stick.
    ///
    /// Units: radians/second
    pub max_angular_speed_rads: f64,

    // ---- HEADING CONTROLLER ----
    /// Heading controller proportional gain
    pub head_k_p: f64,

    /// Heading controller integral gain
    pub head_k_i: f64,

    /// Heading controller derivative gain
    pub head_k_d: f64,

    /// Maximum rate of the heading setpoint profile.
    ///
    /// Units: radians/second
    pub head_max_rate_rads: f64,

    /// Maximum acceleration of the heading setpoint profile.
    ///
    /// Units: radians/second^2
    pub head_max_accel_radss: f64,
}
