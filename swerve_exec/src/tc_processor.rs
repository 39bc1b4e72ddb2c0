//! # Telecommand processor module
//!
//! The telecommand processor handles TCs coming from the driver station script.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};

// Internal
use comms_if::tc::Tc;
use swerve_lib::{
    data_store::DataStore,
    drivetrain::{Drivetrain, HolonomicDrive},
    loc::Pose2D,
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore and drivetrain to send commands to different modules.
pub(crate) fn exec(ds: &mut DataStore, drivetrain: &mut Drivetrain, tc: &Tc) {
    match tc {
        Tc::Enable => ds.set_enabled(true),
        Tc::Disable => ds.set_enabled(false),
        Tc::Drive(input) => {
            ds.driver_input = *input;
        }
        Tc::SetAlliance(a) => ds.vision_loc.set_alliance(*a),
        Tc::ResetPose {
            x_m,
            y_m,
            heading_rad,
        } => {
            drivetrain.reset_pose(Pose2D::new(*x_m, *y_m, *heading_rad));
            ds.pose = drivetrain.pose();
        }
        Tc::ZeroGyro => {
            debug!("Recieved ZeroGyro command");
            drivetrain.zero_gyro();
            ds.pose = drivetrain.pose();
        }
        Tc::SetModuleEnable(enables) => {
            info!("Module enables: {:?}", enables);
            ds.drive_ctrl.set_module_enable(*enables);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tc::{drive::DriverInput, Alliance};
    use swerve_lib::{kinematics, loc};

    fn drivetrain() -> Drivetrain {
        Drivetrain::sim(
            kinematics::Params {
                module_pos_m_rb: [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]],
                max_module_speed_ms: 4.5,
            },
            loc::Params::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_exec() {
        let mut ds = DataStore::default();
        let mut dt = drivetrain();

        exec(&mut ds, &mut dt, &Tc::Enable);
        assert!(ds.enabled);

        let input = DriverInput {
            vx: 0.5,
            ..Default::default()
        };
        exec(&mut ds, &mut dt, &Tc::Drive(input));
        assert_eq!(ds.driver_input, input);

        exec(
            &mut ds,
            &mut dt,
            &Tc::ResetPose {
                x_m: 2.0,
                y_m: 4.0,
                heading_rad: 1.0,
            },
        );
        assert_eq!(dt.pose(), Pose2D::new(2.0, 4.0, 1.0));
        assert_eq!(ds.pose, dt.pose());

        exec(&mut ds, &mut dt, &Tc::ZeroGyro);
        assert_eq!(ds.pose.heading_rad, 0.0);
        assert_eq!(ds.pose.x_m, 2.0);

        exec(&mut ds, &mut dt, &Tc::SetAlliance(Alliance::Red));
        assert_eq!(ds.vision_loc.alliance(), Some(Alliance::Red));

        exec(&mut ds, &mut dt, &Tc::SetModuleEnable([false, true, true, true]));
        assert_eq!(ds.drive_ctrl.module_enable(), [false, true, true, true]);

        exec(&mut ds, &mut dt, &Tc::Disable);
        assert!(!ds.enabled);
    }
}
