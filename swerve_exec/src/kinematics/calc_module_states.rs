//! Forward kinematics, chassis velocity to module states

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use super::{
    ChassisVelocity, KinematicsError, ModuleState, SwerveKinematics, MIN_MODULE_SPEED_MS,
    NUM_MODULES,
};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinematics {
    /// Calculate the module states which achieve the given chassis velocity.
    ///
    /// Field relative velocities are first converted into the robot frame using `heading_rad`,
    /// robot relative velocities ignore it. Each module's velocity is the chassis translational
    /// velocity plus the tangential velocity `omega x r` due to rotation about the robot centre.
    ///
    /// Modules which end up stationary keep the angle they were last commanded to. If any module
    /// would exceed the maximum module speed all four are scaled down together.
    pub fn to_module_states(
        &mut self,
        vel: &ChassisVelocity,
        heading_rad: f64,
    ) -> Result<[ModuleState; NUM_MODULES], KinematicsError> {
        if !vel.is_finite() || !heading_rad.is_finite() {
            return Err(KinematicsError::NonFiniteVelocity(*vel));
        }

        let vel_rb = vel.to_robot_relative(heading_rad);

        let mut states = [ModuleState::default(); NUM_MODULES];

        for (i, pos) in self.module_pos_m_rb.iter().enumerate() {
            let vx = vel_rb.vx_ms - vel_rb.omega_rads * pos.y;
            let vy = vel_rb.vy_ms + vel_rb.omega_rads * pos.x;
            let speed_ms = vx.hypot(vy);

            states[i] = if speed_ms < MIN_MODULE_SPEED_MS {
                ModuleState::new(0.0, self.prev_angles_rad[i])
            } else {
                ModuleState::new(speed_ms, vy.atan2(vx))
            };

            self.prev_angles_rad[i] = states[i].angle_rad;
        }

        if desaturate(&mut states, self.params.max_module_speed_ms) {
            trace!("Module speeds desaturated: {:?}", states);
        }

        Ok(states)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale all module speeds by a common factor so that none exceeds `max_speed_ms`.
///
/// Angles and the ratio between module speeds are unchanged. Returns `true` if the speeds were
/// scaled.
pub fn desaturate(states: &mut [ModuleState; NUM_MODULES], max_speed_ms: f64) -> bool {
    let fastest = states
        .iter()
        .map(|s| s.speed_ms.abs())
        .fold(0.0f64, f64::max);

    if fastest <= max_speed_ms {
        return false;
    }

    let scale = max_speed_ms / fastest;
    for s in states.iter_mut() {
        s.speed_ms *= scale;
    }

    true
}

#[cfg(test)]
mod test {
    use super::super::{test::test_params, ChassisVelocity, Frame};
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    #[test]
    fn test_pure_translation() {
        let mut kin = SwerveKinematics::new(test_params()).unwrap();

        let states = kin
            .to_module_states(&ChassisVelocity::robot(1.0, 1.0, 0.0), 0.0)
            .unwrap();

        for s in states.iter() {
            assert!((s.speed_ms - 2f64.sqrt()).abs() < 1e-12);
            assert!((s.angle_rad - FRAC_PI_4).abs() < 1e-12);
        }
    }

    #[test]
    fn test_pure_rotation() {
        let mut kin = SwerveKinematics::new(test_params()).unwrap();

        let states = kin
            .to_module_states(&ChassisVelocity::robot(0.0, 0.0, 1.0), 0.0)
            .unwrap();

        // Every module is 0.3*sqrt(2) m from the centre, travelling tangentially
        let r = 0.3 * 2f64.sqrt();
        for (i, s) in states.iter().enumerate() {
            assert!((s.speed_ms - r).abs() < 1e-12);

            let pos = kin.module_pos_m_rb[i];
            let v = s.velocity();
            assert!(v.dot(&pos).abs() < 1e-12);
            assert!(pos.x * v.y - pos.y * v.x > 0.0);
        }
    }

    #[test]
    fn test_stationary_holds_angle() {
        let mut kin = SwerveKinematics::new(test_params()).unwrap();

        kin.to_module_states(&ChassisVelocity::robot(0.0, 1.0, 0.0), 0.0)
            .unwrap();
        let states = kin.to_module_states(&ChassisVelocity::zero(), 0.0).unwrap();

        for s in states.iter() {
            assert_eq!(s.speed_ms, 0.0);
            assert!((s.angle_rad - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_field_relative() {
        let mut kin = SwerveKinematics::new(test_params()).unwrap();

        // Driving field +x while facing field +y means driving to the robot's right
        let states = kin
            .to_module_states(
                &ChassisVelocity::field(1.0, 0.0, 0.0),
                std::f64::consts::FRAC_PI_2,
            )
            .unwrap();

        for s in states.iter() {
            assert!((s.speed_ms - 1.0).abs() < 1e-12);
            assert!((s.angle_rad + std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_round_trip() {
        let mut kin = SwerveKinematics::new(test_params()).unwrap();

        let vels = [
            ChassisVelocity::robot(1.0, 0.0, 0.0),
            ChassisVelocity::robot(-0.5, 2.0, 1.5),
            ChassisVelocity::robot(0.0, 0.0, -3.0),
            ChassisVelocity::field(1.2, -0.7, 0.4),
        ];
        let headings = [0.0, 1.0, -2.5, 3.1];

        for v in vels.iter() {
            for h in headings.iter() {
                let states = kin.to_module_states(v, *h).unwrap();
                let back = kin.to_chassis_velocity(&states);
                let expected = v.to_robot_relative(*h);

                assert_eq!(back.frame, Frame::Robot);
                assert!((back.vx_ms - expected.vx_ms).abs() < 1e-9);
                assert!((back.vy_ms - expected.vy_ms).abs() < 1e-9);
                assert!((back.omega_rads - expected.omega_rads).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_desaturate() {
        let mut kin = SwerveKinematics::new(test_params()).unwrap();
        let max = kin.params().max_module_speed_ms;

        let vel = ChassisVelocity::robot(4.0, 1.0, 6.0);

        // Angles before desaturation, computed without a speed limit
        let mut unlimited = SwerveKinematics::new(super::super::Params {
            max_module_speed_ms: 1000.0,
            ..test_params()
        })
        .unwrap();
        let raw = unlimited.to_module_states(&vel, 0.0).unwrap();

        let states = kin.to_module_states(&vel, 0.0).unwrap();

        let fastest = states.iter().map(|s| s.speed_ms.abs()).fold(0.0, f64::max);
        assert!((fastest - max).abs() < 1e-9);

        let scale = states[0].speed_ms / raw[0].speed_ms;
        for i in 0..NUM_MODULES {
            assert!(states[i].speed_ms.abs() <= max + 1e-9);
            assert_eq!(states[i].angle_rad, raw[i].angle_rad);
            assert!((states[i].speed_ms / raw[i].speed_ms - scale).abs() < 1e-9);
        }

        // Nothing to do when already in range
        let mut slow = [ModuleState::new(1.0, 0.0); NUM_MODULES];
        assert!(!desaturate(&mut slow, max));
        assert_eq!(slow[0].speed_ms, 1.0);
    }

    #[test]
    fn test_non_finite() {
        let mut kin = SwerveKinematics::new(test_params()).unwrap();
        assert!(kin
            .to_module_states(&ChassisVelocity::robot(f64::NAN, 0.0, 0.0), 0.0)
            .is_err());
    }
}
