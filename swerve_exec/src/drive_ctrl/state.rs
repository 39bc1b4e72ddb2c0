//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;

// Internal
use super::{
    DriveCtrlError, DriveDemand, HeadingController, Params, PidController, ProfileConstraints,
};
use crate::kinematics::{ChassisVelocity, NUM_MODULES};
use comms_if::tc::drive::DriverInput;
use util::{
    maths::{apply_deadband, get_ang_dist_2pi, signed_square, wrap_pi},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
pub struct DriveCtrl {
    pub(crate) params: Params,

    heading_ctrl: HeadingController,

    /// True while a POV heading override is being followed
    override_active: bool,

    module_enable: [bool; NUM_MODULES],

    pub(crate) report: StatusReport,
}

/// Input data to DriveCtrl.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    pub input: DriverInput,

    /// Current estimated heading on the field
    pub heading_rad: f64,

    pub enabled: bool,

    /// Time since the previous cycle
    pub dt_s: f64,
}

/// Status report for DriveCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// At least one axis was outside [-1, 1]
    pub axes_clamped: bool,

    pub heading_override: bool,

    /// Shortest signed angle from the heading to the override target
    pub heading_error_rad: f64,

    pub cross: bool,

    pub disabled: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for DriveCtrl {
    type InitData = &'static str;
    type InitError = DriveCtrlError;

    type InputData = InputData;
    type OutputData = DriveDemand;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Initialise the DriveCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        let loaded: Params = params::load(init_data).map_err(DriveCtrlError::ParamLoadError)?;

        *self = Self::new(loaded);

        Ok(())
    }

    /// Perform cyclic processing of DriveCtrl.
    ///
    /// On an invalid input the heading controller is reset and an error returned, the caller
    /// should command a stop.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report = StatusReport::default();

        if !input_data.enabled {
            self.release_override(input_data.heading_rad);
            self.report.disabled = true;
            return Ok((self.stop(), self.report));
        }

        let raw = &input_data.input;
        if !(raw.vx.is_finite()
            && raw.vy.is_finite()
            && raw.omega.is_finite()
            && raw.pov_deg.is_finite())
        {
            self.release_override(input_data.heading_rad);
            return Err(DriveCtrlError::InvalidInput(*raw));
        }

        let vx = self.clamp_axis(raw.vx);
        let vy = self.clamp_axis(raw.vy);
        let omega = self.clamp_axis(raw.omega);

        if raw.cross {
            self.release_override(input_data.heading_rad);
            self.report.cross = true;
            return Ok((DriveDemand::Cross, self.report));
        }

        // Deadband the magnitude rather than each axis so diagonals keep their direction
        let magnitude = apply_deadband(vx.hypot(vy).min(1.0), self.params.deadband, 1.0);
        let direction = vy.atan2(vx);

        let rotation = match raw.target_heading_deg() {
            Some(pov_deg) => {
                if !self.override_active {
                    debug!("Heading override to {} deg", pov_deg);
                    self.heading_ctrl.reset(input_data.heading_rad);
                    self.override_active = true;
                }

                let target_rad = wrap_pi(pov_deg.to_radians() + self.params.heading_offset_rad);

                self.report.heading_override = true;
                self.report.heading_error_rad =
                    get_ang_dist_2pi(input_data.heading_rad, target_rad);

                self.heading_ctrl
                    .calculate(input_data.heading_rad, target_rad, input_data.dt_s)
            }
            None => {
                self.release_override(input_data.heading_rad);
                apply_deadband(omega, self.params.deadband, 1.0)
            }
        };

        let speed_ms = signed_square(magnitude) * self.params.max_linear_speed_ms;
        let omega_rads = signed_square(rotation) * self.params.max_angular_speed_rads;

        let (s, c) = direction.sin_cos();
        let vel = if raw.field_oriented {
            ChassisVelocity::field(speed_ms * c, speed_ms * s, omega_rads)
                .to_robot_relative(input_data.heading_rad)
        } else {
            ChassisVelocity::robot(speed_ms * c, speed_ms * s, omega_rads)
        };

        trace!("Drive demand: {:?}", vel);

        Ok((
            DriveDemand::Velocity {
                vel,
                enables: self.module_enable,
            },
            self.report,
        ))
    }
}

impl Default for DriveCtrl {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl DriveCtrl {
    /// Create DriveCtrl from parameters, with all modules enabled.
    pub fn new(params: Params) -> Self {
        let heading_ctrl = HeadingController::new(
            PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
            ProfileConstraints {
                max_rate: params.head_max_rate_rads,
                max_accel: params.head_max_accel_radss,
            },
        );

        Self {
            params,
            heading_ctrl,
            override_active: false,
            module_enable: [true; NUM_MODULES],
            report: StatusReport::default(),
        }
    }

    /// Set the diagnostic per-module enables.
    pub fn set_module_enable(&mut self, enables: [bool; NUM_MODULES]) {
        if enables != self.module_enable {
            debug!("Module enables set to {:?}", enables);
        }
        self.module_enable = enables;
    }

    pub fn module_enable(&self) -> [bool; NUM_MODULES] {
        self.module_enable
    }

    fn stop(&self) -> DriveDemand {
        DriveDemand::Velocity {
            vel: ChassisVelocity::zero(),
            enables: self.module_enable,
        }
    }

    fn release_override(&mut self, heading_rad: f64) {
        if self.override_active {
            self.heading_ctrl.reset(heading_rad);
            self.override_active = false;
        }
    }

    fn clamp_axis(&mut self, value: f64) -> f64 {
        if value.abs() > 1.0 {
            self.report.axes_clamped = true;
        }
        value.max(-1.0).min(1.0)
    }
}
