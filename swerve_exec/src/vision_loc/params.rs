//! Parameters structure for VisionLoc

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for vision localisation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Params {
    /// Path to the field layout JSON file, relative to the parameters directory.
    pub field_layout_path: String,

    /// Maximum distance between an admitted measurement and the current estimate while the robot
    /// is enabled.
    ///
    /// Units: meters
    pub max_measurement_diff_m: f64,

    /// The cameras on the robot. A camera's index in this list is the `cam_idx` the coprocessor
    /// publishes with.
    pub cameras: Vec<CameraExtrinsics>,
}

/// The fixed mounting of a camera on the robot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraExtrinsics {
    /// Name of the camera, for logging only
    pub name: String,

    /// Position of the camera relative to the robot centre.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub offset_m_rb: [f64; 2],

    /// Yaw of the camera's optical axis relative to the robot's forward axis.
    ///
    /// Units: radians
    pub yaw_rad: f64,
}
