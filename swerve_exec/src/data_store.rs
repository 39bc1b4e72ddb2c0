//! # Data Store

use log::info;

use crate::{
    drive_ctrl::{self, DriveDemand},
    loc::Pose2D,
    vision_loc,
};
use comms_if::tc::drive::DriverInput;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Session elapsed time at the start of the cycle
    pub time_s: f64,

    /// Time since the start of the previous cycle
    pub dt_s: f64,

    /// Whether the robot is enabled. The robot starts disabled.
    pub enabled: bool,

    /// Latest driver input, held until a new one arrives
    pub driver_input: DriverInput,

    // Localisation
    pub pose: Pose2D,

    /// Vision measurements fused into the pose this cycle
    pub num_fused: usize,

    // DriveCtrl
    pub drive_ctrl: drive_ctrl::DriveCtrl,
    pub drive_ctrl_output: DriveDemand,
    pub drive_ctrl_status_rpt: drive_ctrl::StatusReport,

    // VisionLoc
    pub vision_loc: vision_loc::VisionLoc,
    pub vision_loc_status_rpt: vision_loc::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle and updates the cycle time.
    pub fn cycle_start(&mut self, time_s: f64) {
        self.dt_s = if self.num_cycles == 0 {
            0.0
        } else {
            (time_s - self.time_s).max(0.0)
        };
        self.time_s = time_s;

        self.num_fused = 0;
        self.drive_ctrl_output = DriveDemand::stop();
        self.drive_ctrl_status_rpt = drive_ctrl::StatusReport::default();
        self.vision_loc_status_rpt = vision_loc::StatusReport::default();
    }

    /// Enable or disable the robot.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            info!("Robot {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;

        // Stale input must not drive the robot when it is re-enabled
        if !enabled {
            self.driver_input = DriverInput::default();
        }
    }
}
