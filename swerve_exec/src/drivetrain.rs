//! # Drivetrain
//!
//! The drivetrain ties the swerve modules and gyro to the kinematics and pose estimator. Each
//! cycle odometry is advanced from the measured module states before the new demand is applied.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};

// Internal
use crate::{
    drive_ctrl::DriveDemand,
    drive_io::{GyroIo, ModuleIo, SimGyro, SimModule},
    kinematics::{
        self, ChassisVelocity, Frame, KinematicsError, ModuleState, SwerveKinematics,
        NUM_MODULES,
    },
    loc::{self, Correction, PoseEstError, PoseEstimator, Pose2D, VisionMeasurement},
};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Interface used by autonomous path following to drive a holonomic robot.
pub trait HolonomicDrive {
    /// Current estimated pose on the field.
    fn pose(&self) -> Pose2D;

    /// Overwrite the estimated pose, for instance at the start of a path.
    fn reset_pose(&mut self, pose: Pose2D);

    /// Measured robot relative chassis velocity.
    fn chassis_velocity(&self) -> ChassisVelocity;

    /// Drive at the given velocity.
    ///
    /// `robot_relative` states which frame the caller believes `vel` is in. If the velocity's
    /// frame disagrees nothing is commanded and `FrameMismatch` is returned.
    fn drive_chassis_velocity(
        &mut self,
        vel: &ChassisVelocity,
        robot_relative: bool,
    ) -> Result<(), KinematicsError>;

    /// Record the pose the path follower is currently aiming for.
    fn set_path_target(&mut self, target: Pose2D);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A four module swerve drivetrain.
pub struct Drivetrain {
    kinematics: SwerveKinematics,

    modules: [Box<dyn ModuleIo>; NUM_MODULES],

    gyro: Box<dyn GyroIo>,

    pose_est: PoseEstimator,

    path_target: Option<Pose2D>,

    last_demand: DriveDemand,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Drivetrain {
    /// Create a drivetrain from its hardware.
    ///
    /// `modules` are in front-left, front-right, back-left, back-right order.
    pub fn new(
        kin_params: kinematics::Params,
        pose_params: loc::Params,
        modules: [Box<dyn ModuleIo>; NUM_MODULES],
        gyro: Box<dyn GyroIo>,
    ) -> Result<Self, KinematicsError> {
        let kinematics = SwerveKinematics::new(kin_params)?;
        let pose_est = PoseEstimator::new(pose_params, kinematics.clone());

        Ok(Self {
            kinematics,
            modules,
            gyro,
            pose_est,
            path_target: None,
            last_demand: DriveDemand::stop(),
        })
    }

    /// Create a drivetrain with simulated hardware.
    pub fn sim(
        kin_params: kinematics::Params,
        pose_params: loc::Params,
    ) -> Result<Self, KinematicsError> {
        Self::new(
            kin_params,
            pose_params,
            [
                Box::new(SimModule::default()),
                Box::new(SimModule::default()),
                Box::new(SimModule::default()),
                Box::new(SimModule::default()),
            ],
            Box::new(SimGyro::default()),
        )
    }

    /// Read the hardware and advance the pose estimate by one cycle.
    pub fn update_odometry(&mut self, dt_s: f64, now_s: f64) -> Result<Pose2D, PoseEstError> {
        for m in self.modules.iter_mut() {
            m.update_inputs(dt_s);
        }

        let states = self.module_states();
        let measured = self.kinematics.to_chassis_velocity(&states);
        self.gyro.update_inputs(dt_s, &measured);

        self.pose_est
            .advance(&states, self.gyro.heading_rad(), dt_s, now_s)
    }

    /// Command the modules to achieve the demand.
    ///
    /// Disabled modules are commanded to zero speed at their current angle. Each module's state
    /// is optimised against its current angle before being sent. Returns the states before
    /// optimisation.
    pub fn apply(
        &mut self,
        demand: &DriveDemand,
    ) -> Result<[ModuleState; NUM_MODULES], KinematicsError> {
        let states = match demand {
            DriveDemand::Cross => self.kinematics.cross_formation(),
            DriveDemand::Velocity { vel, enables } => {
                let mut states = self
                    .kinematics
                    .to_module_states(vel, self.pose_est.pose().heading_rad)?;

                for (i, enabled) in enables.iter().enumerate() {
                    if !enabled {
                        let hold_rad = self.modules[i].current_state().angle_rad;
                        states[i] = ModuleState::new(0.0, hold_rad);
                    }
                }

                states
            }
        };

        for (m, s) in self.modules.iter_mut().zip(states.iter()) {
            let current = m.current_state().angle_rad;
            m.set_desired_state(s.optimise(current));
        }

        self.last_demand = *demand;

        Ok(states)
    }

    /// Blend a vision measurement into the pose estimate.
    pub fn add_vision_measurement(
        &mut self,
        measurement: &VisionMeasurement,
        now_s: f64,
    ) -> Result<Correction, PoseEstError> {
        self.pose_est.correct(measurement, now_s)
    }

    /// Re-zero the gyro, making the robot's current direction heading zero.
    ///
    /// The position estimate is kept.
    pub fn zero_gyro(&mut self) {
        self.gyro.zero();
        self.pose_est.reset_heading(0.0, self.gyro.heading_rad());
        info!("Gyro zeroed, pose now {:?}", self.pose_est.pose());
    }

    pub fn gyro_heading_rad(&self) -> f64 {
        self.gyro.heading_rad()
    }

    /// Gyro heading in the field frame, the raw gyro plus the estimator's heading offset.
    pub fn field_gyro_heading_rad(&self) -> f64 {
        wrap_pi(self.gyro.heading_rad() + self.pose_est.heading_offset_rad())
    }

    /// Measured state of each module.
    pub fn module_states(&self) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];
        for (s, m) in states.iter_mut().zip(self.modules.iter()) {
            *s = m.current_state();
        }
        states
    }

    /// Distance driven by each wheel.
    #[cfg(test)]
    pub fn module_positions_m(&self) -> [f64; NUM_MODULES] {
        let mut pos = [0.0; NUM_MODULES];
        for (p, m) in pos.iter_mut().zip(self.modules.iter()) {
            *p = m.accumulated_position_m();
        }
        pos
    }

    pub fn last_demand(&self) -> DriveDemand {
        self.last_demand
    }

    pub fn path_target(&self) -> Option<Pose2D> {
        self.path_target
    }
}

impl HolonomicDrive for Drivetrain {
    fn pose(&self) -> Pose2D {
        self.pose_est.pose()
    }

    fn reset_pose(&mut self, pose: Pose2D) {
        self.pose_est.reset_to(pose);
        info!("Pose reset to {:?}", pose);
    }

    fn chassis_velocity(&self) -> ChassisVelocity {
        self.kinematics.to_chassis_velocity(&self.module_states())
    }

    fn drive_chassis_velocity(
        &mut self,
        vel: &ChassisVelocity,
        robot_relative: bool,
    ) -> Result<(), KinematicsError> {
        let expected = if robot_relative {
            Frame::Robot
        } else {
            Frame::Field
        };

        if vel.frame != expected {
            return Err(KinematicsError::FrameMismatch {
                expected,
                found: vel.frame,
            });
        }

        let demand = DriveDemand::Velocity {
            vel: vel.to_robot_relative(self.pose_est.pose().heading_rad),
            enables: [true; NUM_MODULES],
        };

        self.apply(&demand).map(|_| ())
    }

    fn set_path_target(&mut self, target: Pose2D) {
        debug!("Path target {:?}", target);
        self.path_target = Some(target);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kinematics::test::test_params;
    use std::f64::consts::{FRAC_PI_2, PI};

    const DT: f64 = 0.02;

    fn drivetrain() -> Drivetrain {
        Drivetrain::sim(test_params(), loc::Params::default()).unwrap()
    }

    #[test]
    fn test_drive_one_tick() {
        let mut dt = drivetrain();
        dt.reset_pose(Pose2D::new(1.0, 1.0, 0.0));

        // Full forward at 4 m/s
        dt.update_odometry(DT, DT).unwrap();
        dt.apply(&DriveDemand::Velocity {
            vel: ChassisVelocity::field(4.0, 0.0, 0.0),
            enables: [true; NUM_MODULES],
        })
        .unwrap();

        let pose = dt.update_odometry(DT, 2.0 * DT).unwrap();
        assert!((pose.x_m - 1.08).abs() < 1e-9);
        assert!((pose.y_m - 1.0).abs() < 1e-9);
        assert!(pose.heading_rad.abs() < 1e-9);

        let vel = dt.chassis_velocity();
        assert_eq!(vel.frame, Frame::Robot);
        assert!((vel.vx_ms - 4.0).abs() < 1e-9);

        for p in dt.module_positions_m().iter() {
            assert!((p - 0.08).abs() < 1e-9);
        }
    }

    #[test]
    fn test_driver_input_one_tick() {
        use crate::drive_ctrl::{self, DriveCtrl};
        use comms_if::tc::drive::DriverInput;
        use util::module::State;

        let mut dc = DriveCtrl::new(drive_ctrl::Params {
            deadband: 0.1,
            max_linear_speed_ms: 4.0,
            max_angular_speed_rads: 2.0 * PI,
            ..Default::default()
        });
        let mut dt = drivetrain();
        dt.reset_pose(Pose2D::new(1.0, 1.0, 0.0));

        let (demand, _) = dc
            .proc(&drive_ctrl::InputData {
                input: DriverInput {
                    vx: 1.0,
                    ..Default::default()
                },
                heading_rad: dt.pose().heading_rad,
                enabled: true,
                dt_s: DT,
            })
            .unwrap();
        dt.apply(&demand).unwrap();

        let pose = dt.update_odometry(DT, DT).unwrap();
        assert!((pose.x_m - 1.08).abs() < 1e-9);
        assert!((pose.y_m - 1.0).abs() < 1e-9);
        assert!(pose.heading_rad.abs() < 1e-9);
    }

    #[test]
    fn test_rotation_reaches_gyro() {
        let mut dt = drivetrain();

        dt.apply(&DriveDemand::Velocity {
            vel: ChassisVelocity::robot(0.0, 0.0, PI),
            enables: [true; NUM_MODULES],
        })
        .unwrap();

        // Half a second at pi rad/s
        let mut pose = dt.pose();
        for i in 0..25 {
            pose = dt.update_odometry(DT, (i + 1) as f64 * DT).unwrap();
        }

        assert!((dt.gyro_heading_rad() - FRAC_PI_2).abs() < 1e-9);
        assert!((pose.heading_rad - FRAC_PI_2).abs() < 1e-9);
        assert!(pose.x_m.abs() < 1e-9 && pose.y_m.abs() < 1e-9);
    }

    #[test]
    fn test_disabled_module_and_optimise() {
        let mut dt = drivetrain();

        dt.apply(&DriveDemand::Velocity {
            vel: ChassisVelocity::robot(1.0, 0.0, 0.0),
            enables: [true, false, true, true],
        })
        .unwrap();
        dt.update_odometry(DT, DT).unwrap();

        let states = dt.module_states();
        assert_eq!(states[1].speed_ms, 0.0);
        assert_eq!(states[0].speed_ms, 1.0);

        // Driving backwards flips the wheels rather than turning them round
        dt.apply(&DriveDemand::Velocity {
            vel: ChassisVelocity::robot(-1.0, 0.0, 0.0),
            enables: [true; NUM_MODULES],
        })
        .unwrap();
        dt.update_odometry(DT, 2.0 * DT).unwrap();

        let states = dt.module_states();
        assert_eq!(states[0].speed_ms, -1.0);
        assert!(states[0].angle_rad.abs() < 1e-9);
    }

    #[test]
    fn test_cross() {
        let mut dt = drivetrain();
        let states = dt.apply(&DriveDemand::Cross).unwrap();
        dt.update_odometry(DT, DT).unwrap();

        assert_eq!(dt.last_demand(), DriveDemand::Cross);
        for (s, m) in states.iter().zip(dt.module_states().iter()) {
            assert_eq!(m.speed_ms, 0.0);
            assert!((s.angle_rad - m.angle_rad).abs() < 1e-12);
        }
    }

    #[test]
    fn test_frame_mismatch() {
        let mut dt = drivetrain();

        match dt.drive_chassis_velocity(&ChassisVelocity::field(1.0, 0.0, 0.0), true) {
            Err(KinematicsError::FrameMismatch { expected, found }) => {
                assert_eq!(expected, Frame::Robot);
                assert_eq!(found, Frame::Field);
            }
            r => panic!("Expected a frame mismatch, got {:?}", r),
        }

        dt.drive_chassis_velocity(&ChassisVelocity::field(1.0, 0.0, 0.0), false)
            .unwrap();
        dt.set_path_target(Pose2D::new(2.0, 3.0, 0.0));
        assert_eq!(dt.path_target(), Some(Pose2D::new(2.0, 3.0, 0.0)));
    }

    #[test]
    fn test_zero_gyro() {
        let mut dt = drivetrain();
        dt.reset_pose(Pose2D::new(2.0, 3.0, 1.0));

        dt.zero_gyro();
        let pose = dt.pose();
        assert_eq!(pose.heading_rad, 0.0);
        assert_eq!(pose.x_m, 2.0);
        assert_eq!(pose.y_m, 3.0);
        assert_eq!(dt.gyro_heading_rad(), 0.0);
    }

    #[test]
    fn test_field_gyro_heading() {
        let mut dt = drivetrain();
        dt.reset_pose(Pose2D::new(2.0, 3.0, FRAC_PI_2));

        // Raw gyro untouched, field frame follows the reset
        assert_eq!(dt.gyro_heading_rad(), 0.0);
        assert!((dt.field_gyro_heading_rad() - FRAC_PI_2).abs() < 1e-12);

        // Spin for a cycle, both move together
        dt.update_odometry(DT, DT).unwrap();
        dt.apply(&DriveDemand::Velocity {
            vel: ChassisVelocity::robot(0.0, 0.0, 1.0),
            enables: [true; NUM_MODULES],
        })
        .unwrap();
        dt.update_odometry(DT, 2.0 * DT).unwrap();

        let raw = dt.gyro_heading_rad();
        assert!(raw > 0.0);
        assert!((dt.field_gyro_heading_rad() - (FRAC_PI_2 + raw)).abs() < 1e-9);
        assert!((dt.field_gyro_heading_rad() - dt.pose().heading_rad).abs() < 1e-9);
    }
}
