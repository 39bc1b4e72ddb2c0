//! Inverse kinematics, module states to chassis velocity

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

use super::{ChassisVelocity, ModuleState, SwerveKinematics, NUM_MODULES};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinematics {
    /// Calculate the robot relative chassis velocity from measured module states.
    ///
    /// The eight module velocity components overdetermine the three chassis velocity components,
    /// so this is the least squares solution `(A^T A)^-1 A^T b`.
    pub fn to_chassis_velocity(&self, states: &[ModuleState; NUM_MODULES]) -> ChassisVelocity {
        let mut atb = Vector3::zeros();

        for (pos, state) in self.module_pos_m_rb.iter().zip(states.iter()) {
            let v = state.velocity();

            atb[0] += v.x;
            atb[1] += v.y;
            atb[2] += -pos.y * v.x + pos.x * v.y;
        }

        let x = self.inv_ata * atb;

        ChassisVelocity::robot(x[0], x[1], x[2])
    }
}

#[cfg(test)]
mod test {
    use super::super::test::test_params;
    use super::*;

    #[test]
    fn test_stationary() {
        let kin = SwerveKinematics::new(test_params()).unwrap();
        let vel = kin.to_chassis_velocity(&[ModuleState::new(0.0, 1.0); NUM_MODULES]);

        assert_eq!(vel, ChassisVelocity::zero());
    }

    #[test]
    fn test_inconsistent_states() {
        let kin = SwerveKinematics::new(test_params()).unwrap();

        // One module slipping, the estimate is the average of what the wheels report
        let mut states = [ModuleState::new(1.0, 0.0); NUM_MODULES];
        states[0].speed_ms = 2.0;

        let vel = kin.to_chassis_velocity(&states);
        assert!((vel.vx_ms - 1.25).abs() < 1e-9);
        assert!(vel.vy_ms.abs() < 1e-9);
    }
}
