//! # Drive hardware interfaces
//!
//! The drivetrain talks to its swerve modules and gyro only through the traits in this module,
//! so the control code is the same on the robot and in simulation.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::kinematics::{ChassisVelocity, ModuleState};

pub use sim::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The hardware backend driving the modules and gyro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Ideal simulated modules and gyro
    Sim,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A single swerve module.
pub trait ModuleIo: Send {
    /// Refresh the measured state, `dt_s` seconds after the previous refresh.
    fn update_inputs(&mut self, dt_s: f64);

    /// Command the module's drive speed and steer angle.
    fn set_desired_state(&mut self, state: ModuleState);

    /// Measured drive speed and steer angle.
    fn current_state(&self) -> ModuleState;

    /// Total distance driven by the wheel.
    ///
    /// Units: meters
    fn accumulated_position_m(&self) -> f64;
}

/// The robot's gyro.
pub trait GyroIo: Send {
    /// Refresh the measured heading. `measured_vel` is the chassis velocity measured from the
    /// modules over the same interval, which simulated gyros integrate.
    fn update_inputs(&mut self, dt_s: f64, measured_vel: &ChassisVelocity);

    /// Heading relative to the last zero, counter-clockwise positive.
    ///
    /// Units: radians
    fn heading_rad(&self) -> f64;

    /// Units: radians/second
    fn heading_rate_rads(&self) -> f64;

    /// Make the current direction heading zero.
    fn zero(&mut self);
}
