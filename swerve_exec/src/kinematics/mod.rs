//! # Swerve kinematics module
//!
//! Converts chassis velocity demands into individual module (wheel speed and steer angle) states,
//! and measured module states back into a chassis velocity.
//!
//! Module arrays are always ordered front-left, front-right, back-left, back-right, see
//! [`ModuleId`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_chassis_vel;
mod calc_module_states;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Matrix3, Vector2};
use serde::{Deserialize, Serialize};

// Internal
pub use params::*;
use util::maths::{get_ang_dist_2pi, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of swerve modules on the robot.
pub const NUM_MODULES: usize = 4;

/// Module speeds below this are treated as stationary, and hold their previous angle.
///
/// Units: meters/second
pub const MIN_MODULE_SPEED_MS: f64 = 1e-6;

/// Steer angles of the cross (defensive) formation, in module order.
///
/// Units: radians
pub const CROSS_ANGLES_RAD: [f64; NUM_MODULES] = [
    std::f64::consts::FRAC_PI_4,
    -std::f64::consts::FRAC_PI_4,
    -std::f64::consts::FRAC_PI_4,
    std::f64::consts::FRAC_PI_4,
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The demanded or measured state of a single swerve module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Signed linear speed of the wheel.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Steer angle of the wheel relative to the robot's forward axis, in (-pi, pi].
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// A velocity of the whole chassis.
///
/// The frame the velocity is expressed in is always carried with it, convert between frames with
/// [`ChassisVelocity::to_robot_relative`] and [`ChassisVelocity::to_field_relative`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChassisVelocity {
    /// Velocity along the frame's x axis.
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Velocity along the frame's y axis.
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Angular velocity, positive anticlockwise.
    ///
    /// Units: radians/second
    pub omega_rads: f64,

    /// The frame the linear components are expressed in.
    pub frame: Frame,
}

/// The swerve kinematics model.
///
/// Holds the module geometry, the precomputed least squares solution for the inverse kinematics,
/// and the last commanded angle of each module.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    pub(crate) params: Params,

    /// Module positions in the robot body frame.
    pub(crate) module_pos_m_rb: [Vector2<f64>; NUM_MODULES],

    /// Inverse of `A^T A` where `A` maps chassis velocity to module velocity components.
    pub(crate) inv_ata: Matrix3<f64>,

    /// Angle each module was last commanded to.
    pub(crate) prev_angles_rad: [f64; NUM_MODULES],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identifies a swerve module. The discriminant is the module's index in every module array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleId {
    FrontLeft = 0,
    FrontRight = 1,
    BackLeft = 2,
    BackRight = 3,
}

/// The reference frame a velocity is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Fixed to the field, x along the field length.
    Field,

    /// Fixed to the robot, x forwards.
    Robot,
}

/// Possible errors from the kinematics.
#[derive(Debug, thiserror::Error)]
pub enum KinematicsError {
    #[error("The module geometry is degenerate, the inverse kinematics has no solution")]
    DegenerateGeometry,

    #[error("Maximum module speed must be positive, found {0}")]
    InvalidMaxSpeed(f64),

    #[error("Chassis velocity contains non-finite values: {0:?}")]
    NonFiniteVelocity(ChassisVelocity),

    #[error("Velocity is expressed in the {found:?} frame but {expected:?} was requested")]
    FrameMismatch { expected: Frame, found: Frame },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleId {
    /// All modules in array order.
    pub const ALL: [ModuleId; NUM_MODULES] = [
        ModuleId::FrontLeft,
        ModuleId::FrontRight,
        ModuleId::BackLeft,
        ModuleId::BackRight,
    ];

    /// Index of this module in module arrays.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl ModuleState {
    /// Create a new state, wrapping the angle into (-pi, pi].
    pub fn new(speed_ms: f64, angle_rad: f64) -> Self {
        Self {
            speed_ms,
            angle_rad: wrap_pi(angle_rad),
        }
    }

    /// Velocity of the wheel contact point in the robot frame.
    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(
            self.speed_ms * self.angle_rad.cos(),
            self.speed_ms * self.angle_rad.sin(),
        )
    }

    /// Minimise the steer motion needed to reach this state.
    ///
    /// If the demanded angle is more than 90 degrees away from the module's current angle the
    /// wheel is driven in reverse at the opposite angle, which gives the same wheel velocity.
    pub fn optimise(self, current_angle_rad: f64) -> Self {
        let delta = get_ang_dist_2pi(current_angle_rad, self.angle_rad);

        if delta.abs() > std::f64::consts::FRAC_PI_2 {
            Self::new(-self.speed_ms, self.angle_rad + std::f64::consts::PI)
        } else {
            self
        }
    }
}

impl ChassisVelocity {
    /// A velocity in the field frame.
    pub fn field(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
            frame: Frame::Field,
        }
    }

    /// A velocity in the robot frame.
    pub fn robot(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
            frame: Frame::Robot,
        }
    }

    /// Zero velocity in the robot frame.
    pub fn zero() -> Self {
        Self::robot(0.0, 0.0, 0.0)
    }

    /// Express this velocity in the robot frame, given the robot's heading on the field.
    pub fn to_robot_relative(&self, heading_rad: f64) -> Self {
        match self.frame {
            Frame::Robot => *self,
            Frame::Field => {
                let (s, c) = heading_rad.sin_cos();
                Self::robot(
                    self.vx_ms * c + self.vy_ms * s,
                    -self.vx_ms * s + self.vy_ms * c,
                    self.omega_rads,
                )
            }
        }
    }

    /// Express this velocity in the field frame, given the robot's heading on the field.
    pub fn to_field_relative(&self, heading_rad: f64) -> Self {
        match self.frame {
            Frame::Field => *self,
            Frame::Robot => {
                let (s, c) = heading_rad.sin_cos();
                Self::field(
                    self.vx_ms * c - self.vy_ms * s,
                    self.vx_ms * s + self.vy_ms * c,
                    self.omega_rads,
                )
            }
        }
    }

    /// Linear speed of the chassis.
    pub fn speed_ms(&self) -> f64 {
        self.vx_ms.hypot(self.vy_ms)
    }

    pub fn is_finite(&self) -> bool {
        self.vx_ms.is_finite() && self.vy_ms.is_finite() && self.omega_rads.is_finite()
    }
}

impl SwerveKinematics {
    /// Build the kinematics for the given module geometry.
    pub fn new(params: Params) -> Result<Self, KinematicsError> {
        if !(params.max_module_speed_ms > 0.0) {
            return Err(KinematicsError::InvalidMaxSpeed(params.max_module_speed_ms));
        }

        let mut module_pos_m_rb = [Vector2::zeros(); NUM_MODULES];
        let mut ata = Matrix3::zeros();

        for id in ModuleId::ALL.iter() {
            let [x, y] = params.module_pos_m_rb[id.index()];
            module_pos_m_rb[id.index()] = Vector2::new(x, y);

            // Each module contributes two rows to A: [1, 0, -y] and [0, 1, x]
            ata[(0, 0)] += 1.0;
            ata[(1, 1)] += 1.0;
            ata[(0, 2)] -= y;
            ata[(2, 0)] -= y;
            ata[(1, 2)] += x;
            ata[(2, 1)] += x;
            ata[(2, 2)] += x * x + y * y;
        }

        let inv_ata = ata
            .try_inverse()
            .ok_or(KinematicsError::DegenerateGeometry)?;

        Ok(Self {
            params,
            module_pos_m_rb,
            inv_ata,
            prev_angles_rad: [0.0; NUM_MODULES],
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Get the cross formation, all modules stationary and angled to resist being pushed.
    pub fn cross_formation(&mut self) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];

        for (i, angle) in CROSS_ANGLES_RAD.iter().enumerate() {
            states[i] = ModuleState::new(0.0, *angle);
            self.prev_angles_rad[i] = *angle;
        }

        states
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    /// A square 0.6 m track robot with 4.5 m/s modules
    pub(crate) fn test_params() -> Params {
        Params {
            module_pos_m_rb: [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]],
            max_module_speed_ms: 4.5,
        }
    }

    #[test]
    fn test_module_ids() {
        for (i, id) in ModuleId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_frame_conversion() {
        let v = ChassisVelocity::field(1.0, 0.0, 0.5);

        // Facing +y on the field, field +x is to the robot's right
        let r = v.to_robot_relative(FRAC_PI_2);
        assert_eq!(r.frame, Frame::Robot);
        assert!(r.vx_ms.abs() < 1e-12);
        assert!((r.vy_ms + 1.0).abs() < 1e-12);
        assert_eq!(r.omega_rads, 0.5);

        let f = r.to_field_relative(FRAC_PI_2);
        assert!((f.vx_ms - 1.0).abs() < 1e-12);
        assert!(f.vy_ms.abs() < 1e-12);

        // Already in the right frame, untouched
        assert_eq!(r.to_robot_relative(1.0), r);
    }

    #[test]
    fn test_optimise() {
        // Small change, untouched
        let s = ModuleState::new(2.0, 0.3).optimise(0.0);
        assert_eq!(s.speed_ms, 2.0);
        assert!((s.angle_rad - 0.3).abs() < 1e-12);

        // Wanting to go backwards, flip the wheel speed instead of the wheel
        let s = ModuleState::new(2.0, PI - 0.1).optimise(0.0);
        assert_eq!(s.speed_ms, -2.0);
        assert!((s.angle_rad + 0.1).abs() < 1e-12);

        // Velocity of the wheel is unchanged
        let v0 = ModuleState::new(2.0, PI - 0.1).velocity();
        let v1 = s.velocity();
        assert!((v0 - v1).norm() < 1e-12);
    }

    #[test]
    fn test_cross_formation() {
        let mut kin = SwerveKinematics::new(test_params()).unwrap();
        let states = kin.cross_formation();

        for (i, s) in states.iter().enumerate() {
            assert_eq!(s.speed_ms, 0.0);
            assert_eq!(s.angle_rad, CROSS_ANGLES_RAD[i]);
        }

        // Front-left and back-right are parallel, and perpendicular to the other pair
        assert_eq!(states[0].angle_rad, states[3].angle_rad);
        assert_eq!(states[1].angle_rad, states[2].angle_rad);
        assert!((states[0].angle_rad - states[1].angle_rad - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_geometry() {
        let params = Params {
            module_pos_m_rb: [[0.0, 0.0]; NUM_MODULES],
            max_module_speed_ms: 4.5,
        };
        assert!(matches!(
            SwerveKinematics::new(params),
            Err(KinematicsError::DegenerateGeometry)
        ));

        let params = Params {
            max_module_speed_ms: 0.0,
            ..test_params()
        };
        assert!(matches!(
            SwerveKinematics::new(params),
            Err(KinematicsError::InvalidMaxSpeed(_))
        ));
    }
}
