//! # Vision localisation module
//!
//! VisionLoc turns the tag detections published by the vision coprocessor into field relative
//! robot poses, and decides which of them are plausible enough to be fused into the pose
//! estimate.
//!
//! Each camera publishes three independent streams (translation, rotation and tag id). Every
//! cycle VisionLoc drains all three, resynchronises them if their lengths differ, and pairs the
//! entries by position. A triple is only used if it reports a real tag and all three timestamps
//! agree.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_field_pose;
mod params;
mod resync;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use calc_field_pose::*;
pub use params::*;
pub use resync::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during VisionLoc operation.
#[derive(Debug, thiserror::Error)]
pub enum VisionLocError {
    #[error("Could not load the VisionLoc parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("The observation queues for camera {0} are disconnected")]
    CameraDisconnected(usize),

    #[error("All {0} cameras are disconnected")]
    AllCamerasDisconnected(usize),
}
