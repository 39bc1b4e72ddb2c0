//! Simulated drive hardware

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{GyroIo, ModuleIo};
use crate::kinematics::{ChassisVelocity, ModuleState};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A module which tracks its demand perfectly.
///
/// The demand is reached at the next `update_inputs`, so the module lags its demand by one cycle
/// like a real module read before it is commanded.
#[derive(Debug, Clone, Default)]
pub struct SimModule {
    desired: ModuleState,
    current: ModuleState,
    position_m: f64,
}

/// A gyro which integrates the measured chassis rotation rate.
#[derive(Debug, Clone, Default)]
pub struct SimGyro {
    heading_rad: f64,
    rate_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleIo for SimModule {
    fn update_inputs(&mut self, dt_s: f64) {
        self.current = self.desired;
        self.position_m += self.current.speed_ms * dt_s;
    }

    fn set_desired_state(&mut self, state: ModuleState) {
        self.desired = state;
    }

    fn current_state(&self) -> ModuleState {
        self.current
    }

    fn accumulated_position_m(&self) -> f64 {
        self.position_m
    }
}

impl GyroIo for SimGyro {
    fn update_inputs(&mut self, dt_s: f64, measured_vel: &ChassisVelocity) {
        self.rate_rads = measured_vel.omega_rads;
        self.heading_rad = wrap_pi(self.heading_rad + self.rate_rads * dt_s);
    }

    fn heading_rad(&self) -> f64 {
        self.heading_rad
    }

    fn heading_rate_rads(&self) -> f64 {
        self.rate_rads
    }

    fn zero(&mut self) {
        self.heading_rad = 0.0;
    }
}
