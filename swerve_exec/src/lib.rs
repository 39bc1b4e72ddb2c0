//! # Swerve library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the swerve crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable
pub mod data_store;

/// Drive control module - shapes driver input into chassis velocity demands
pub mod drive_ctrl;

/// Drive hardware interfaces and their simulated implementations
pub mod drive_io;

/// Drivetrain - owns the modules, gyro and pose estimator
pub mod drivetrain;

/// Field layout - poses of the AprilTags on the field
pub mod field_layout;

/// Swerve kinematics - converts between chassis velocity and module states
pub mod kinematics;

/// Localisation module - odometry and vision fused pose estimate
pub mod loc;

/// Executable parameters
pub mod params;

/// Vision client - receives tag detections from the vision coprocessor
#[cfg(feature = "vision")]
pub mod vision_client;

/// Vision localisation module - turns tag detections into robot poses
pub mod vision_loc;
