//! # Heading controller
//!
//! A profiled PID controller for the robot heading. The goal is approached along a trapezoidal
//! setpoint profile, and the PID acts on the error between the setpoint and the measured heading.
//!
//! Heading is a continuous input: the goal and setpoint are always re-expressed within half a
//! turn of the measurement, so the robot rotates the short way round.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use util::maths::{get_ang_dist_2pi, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// Limits on the setpoint profile.
#[derive(Debug, Serialize, Clone, Copy)]
pub struct ProfileConstraints {
    /// Units: radians/second
    pub max_rate: f64,

    /// Units: radians/second^2
    pub max_accel: f64,
}

/// A point on the setpoint profile.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct ProfileState {
    /// Units: radians
    pub pos: f64,

    /// Units: radians/second
    pub rate: f64,
}

/// Profiled, continuous input heading controller.
#[derive(Debug, Serialize, Clone)]
pub struct HeadingController {
    pid: PidController,

    constraints: ProfileConstraints,

    setpoint: ProfileState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0f64,
            prev_error: None,
        }
    }

    /// Get the value of the controller for the given error, `dt` seconds after the previous one.
    pub fn get(&mut self, error: f64, dt: f64) -> f64 {
        // Without a positive time step neither the integral nor the derivative can be formed, so
        // only the proportional term is used
        let valid_dt = dt > 0.0;

        if valid_dt {
            self.integral += error * dt;
        }

        let deriv = match (self.prev_error, valid_dt) {
            (Some(e), true) => (error - e) / dt,
            _ => 0f64,
        };

        self.prev_error = Some(error);

        self.k_p * error + self.k_i * self.integral + self.k_d * deriv
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }
}

impl ProfileState {
    /// Advance this state one step of `dt` towards `goal`, a stationary target.
    ///
    /// The rate is limited by both the maximum rate and the rate from which the goal can still be
    /// reached at maximum deceleration, and changes by at most `max_accel * dt` per step.
    pub fn step(self, goal: f64, constraints: &ProfileConstraints, dt: f64) -> Self {
        let remaining = goal - self.pos;
        let dir = remaining.signum();

        let braking_rate = (2.0 * constraints.max_accel * remaining.abs()).sqrt();
        let target_rate = dir * braking_rate.min(constraints.max_rate);

        let max_dv = constraints.max_accel * dt;
        let rate = self.rate + (target_rate - self.rate).max(-max_dv).min(max_dv);
        let pos = self.pos + rate * dt;

        // Arrived, or stepped past the goal
        let after = goal - pos;
        if after.abs() < 1e-9 || after.signum() != dir {
            return Self {
                pos: goal,
                rate: 0.0,
            };
        }

        Self { pos, rate }
    }
}

impl HeadingController {
    /// Create a new controller.
    pub fn new(pid: PidController, constraints: ProfileConstraints) -> Self {
        Self {
            pid,
            constraints,
            setpoint: ProfileState::default(),
        }
    }

    /// Restart the profile from the measured heading, at rest.
    pub fn reset(&mut self, measurement_rad: f64) {
        self.pid.reset();
        self.setpoint = ProfileState {
            pos: measurement_rad,
            rate: 0.0,
        };
    }

    pub fn setpoint(&self) -> ProfileState {
        self.setpoint
    }

    /// Calculate the normalised rotation demand, in [-1, 1], to bring the measured heading to the
    /// goal.
    pub fn calculate(&mut self, measurement_rad: f64, goal_rad: f64, dt: f64) -> f64 {
        // Bring the goal and setpoint within half a turn of the measurement
        let goal = measurement_rad + get_ang_dist_2pi(measurement_rad, goal_rad);
        self.setpoint.pos = measurement_rad + get_ang_dist_2pi(measurement_rad, self.setpoint.pos);

        self.setpoint = self.setpoint.step(goal, &self.constraints, dt);

        let error = wrap_pi(self.setpoint.pos - measurement_rad);

        self.pid.get(error, dt).max(-1.0).min(1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    const DT: f64 = 0.02;

    fn ctrl() -> HeadingController {
        HeadingController::new(
            PidController::new(2.0, 0.0, 0.0),
            ProfileConstraints {
                max_rate: 2.0 * PI,
                max_accel: 4.0 * PI,
            },
        )
    }

    #[test]
    fn test_pid() {
        let mut pid = PidController::new(1.0, 0.5, 0.1);

        // First call has no history
        assert!((pid.get(1.0, 0.1) - (1.0 + 0.05)).abs() < 1e-12);

        // Integral 0.1 + 0.05, derivative (0.5 - 1) / 0.1
        let out = pid.get(0.5, 0.1);
        assert!((out - (0.5 + 0.5 * 0.15 - 0.5)).abs() < 1e-12);

        pid.reset();
        assert_eq!(pid.get(1.0, 0.0), 1.0);
    }

    #[test]
    fn test_profile_trapezoid() {
        let c = ProfileConstraints {
            max_rate: 1.0,
            max_accel: 2.0,
        };

        let mut s = ProfileState::default();
        let mut max_rate: f64 = 0.0;
        let mut steps = 0;

        while s.pos != 3.0 && steps < 1000 {
            let next = s.step(3.0, &c, DT);
            if next.pos != 3.0 {
                assert!((next.rate - s.rate).abs() <= 2.0 * DT + 1e-12);
            }
            max_rate = max_rate.max(next.rate);
            s = next;
            steps += 1;
        }

        assert_eq!(s.pos, 3.0);
        assert_eq!(s.rate, 0.0);
        assert!((max_rate - 1.0).abs() < 1e-9);

        // 3 rad at 1 rad/s plus accelerating and braking, about 3.5 s
        assert!(steps > 165 && steps < 190);
    }

    #[test]
    fn test_short_way_round() {
        let mut c = ctrl();

        // Heading 1 degree, target 359 degrees, go the 2 degree way (clockwise)
        let measurement = 1f64.to_radians();
        c.reset(measurement);
        let out = c.calculate(measurement, 359f64.to_radians(), DT);

        assert!(out < 0.0);

        // The setpoint moves towards -1 degree, not towards 359
        let sp = c.setpoint();
        assert!(sp.pos < measurement);
        assert!(sp.pos > -1f64.to_radians() - 1e-9);
    }

    #[test]
    fn test_across_the_wrap() {
        let mut c = ctrl();

        // Heading 179 degrees, target -179 degrees, go anticlockwise through 180
        let measurement = 179f64.to_radians();
        c.reset(measurement);
        let out = c.calculate(measurement, -179f64.to_radians(), DT);
        assert!(out > 0.0);
    }

    #[test]
    fn test_converges_and_saturates() {
        let mut c = ctrl();

        // Simple plant, heading rate proportional to the demand
        let mut heading: f64 = 0.0;
        c.reset(heading);

        for _ in 0..500 {
            let out = c.calculate(heading, PI / 2.0, DT);
            assert!(out <= 1.0 && out >= -1.0);
            heading = wrap_pi(heading + out * 2.0 * PI * DT);
        }

        assert!((heading - PI / 2.0).abs() < 1e-3);
    }
}
