//! Main swerve drive executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Telecommand processing from the driver station script
//!         - Odometry, reading the modules and gyro
//!         - Vision localisation and fusion into the pose estimate
//!         - Drive control processing
//!         - Actuation of the modules
//!
//! # Modules
//!
//! All cyclic modules (e.g. `drive_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

#[cfg(feature = "vision")]
use comms_if::net::NetParams;
#[cfg(feature = "vision")]
use swerve_lib::vision_client::VisionClient;
use swerve_lib::{
    data_store::DataStore,
    drive_ctrl::{self, DriveDemand},
    drive_io::Backend,
    drivetrain::{Drivetrain, HolonomicDrive},
    kinematics,
    loc,
    params::SwerveExecParams,
    vision_loc::{self, VisionLocError},
};

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, trace, warn};
use std::env;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("swerve_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Swerve Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: SwerveExecParams =
        util::params::load("swerve_exec.toml").wrap_err("Could not load exec params")?;
    let kin_params: kinematics::Params =
        util::params::load("kinematics.toml").wrap_err("Could not load kinematics params")?;
    let pose_params: loc::Params =
        util::params::load("pose_est.toml").wrap_err("Could not load pose estimator params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the script path
    let mut script = if args.len() == 2 {
        info!("Loading script from \"{}\"", &args[1]);

        let si = ScriptInterpreter::new(&args[1]).wrap_err("Failed to load script")?;

        info!(
            "Loaded script lasts {:.02} s and contains {} TCs\n",
            si.get_duration(),
            si.get_num_tcs()
        );

        Some(si)
    } else if args.len() == 1 {
        info!("No script provided, the robot will idle disabled\n");
        None
    } else {
        return Err(eyre!(
            "Expected either zero or one argument, found {}",
            args.len() - 1
        ));
    };

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.drive_ctrl
        .init("drive_ctrl.toml", &session)
        .wrap_err("Failed to initialise DriveCtrl")?;
    info!("DriveCtrl init complete");

    ds.vision_loc
        .init("vision_loc.toml", &session)
        .wrap_err("Failed to initialise VisionLoc")?;
    info!("VisionLoc init complete");

    match exec_params.alliance {
        Some(a) => ds.vision_loc.set_alliance(a),
        None => warn!("Alliance not set, using the blue origin until a SET_ALLIANCE TC arrives"),
    }

    let mut drivetrain = match exec_params.backend {
        Backend::Sim => Drivetrain::sim(kin_params, pose_params),
    }
    .wrap_err("Failed to initialise the drivetrain")?;
    drivetrain.reset_pose(exec_params.start_pose);
    ds.pose = drivetrain.pose();
    info!("Drivetrain init complete ({:?} backend)", exec_params.backend);

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    #[cfg(feature = "vision")]
    let vision_client = if exec_params.vision_enabled {
        info!("Initialising network");
        init_vision_client(&mut ds)
    } else {
        info!("Vision disabled, running on odometry only");
        None
    };

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let script_start_s = session::get_elapsed_seconds();

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(session::get_elapsed_seconds());

        // ---- TELECOMMAND PROCESSING ----

        if let Some(ref mut si) = script {
            match si.get_pending_tcs(ds.time_s - script_start_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        tc_processor::exec(&mut ds, &mut drivetrain, tc);
                    }
                }
                // Exit if end of script reached
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break;
                }
            }
        }

        // ---- ODOMETRY ----

        match drivetrain.update_odometry(ds.dt_s, ds.time_s) {
            Ok(p) => ds.pose = p,
            Err(e) => warn!("Odometry update failed: {}", e),
        }

        // ---- VISION LOCALISATION ----

        let vision_input = vision_loc::InputData {
            pose: ds.pose,
            gyro_heading_rad: drivetrain.field_gyro_heading_rad(),
            enabled: ds.enabled,
        };

        match ds.vision_loc.proc(&vision_input) {
            Ok((measurements, r)) => {
                for m in measurements.iter() {
                    match drivetrain.add_vision_measurement(m, ds.time_s) {
                        Ok(_) => ds.num_fused += 1,
                        Err(e) => debug!("Vision measurement not fused: {}", e),
                    }
                }
                ds.vision_loc_status_rpt = r;
            }
            // Each camera is reported as it disconnects
            Err(VisionLocError::AllCamerasDisconnected(_)) => (),
            Err(e) => warn!("Error during VisionLoc processing: {}", e),
        }

        ds.pose = drivetrain.pose();

        // ---- CONTROL ALGORITHM PROCESSING ----

        let drive_input = drive_ctrl::InputData {
            input: ds.driver_input,
            heading_rad: ds.pose.heading_rad,
            enabled: ds.enabled,
            dt_s: ds.dt_s,
        };

        match ds.drive_ctrl.proc(&drive_input) {
            Ok((o, r)) => {
                ds.drive_ctrl_output = o;
                ds.drive_ctrl_status_rpt = r;
            }
            Err(e) => {
                warn!("Error during DriveCtrl processing, stopping: {}", e);
                ds.drive_ctrl_output = DriveDemand::stop();
            }
        }

        // ---- ACTUATION ----

        if let Err(e) = drivetrain.apply(&ds.drive_ctrl_output) {
            warn!("Could not apply the drive demand, stopping: {}", e);
            if let Err(e) = drivetrain.apply(&DriveDemand::stop()) {
                error!("Could not stop the drivetrain: {}", e);
            }
        }

        trace!("Pose: {:?}, demand: {:?}", ds.pose, ds.drive_ctrl_output);

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    if let Err(e) = drivetrain.apply(&DriveDemand::stop()) {
        error!("Could not stop the drivetrain: {}", e);
    }

    #[cfg(feature = "vision")]
    if let Some(c) = vision_client {
        info!(
            "VisionClient published {} observations, rejected {}",
            c.num_published(),
            c.num_rejected()
        );
    }

    info!("End of execution");

    Ok(())
}

/// Start the vision client publishing into VisionLoc's queues.
///
/// Failure is not fatal, the robot runs on odometry only.
#[cfg(feature = "vision")]
fn init_vision_client(ds: &mut DataStore) -> Option<VisionClient> {
    let net_params: NetParams = match util::params::load("net.toml") {
        Ok(p) => p,
        Err(e) => {
            warn!("Could not load net params ({}), running on odometry only", e);
            return None;
        }
    };

    let publishers = ds.vision_loc.take_publishers()?;
    let zmq_ctx = comms_if::net::zmq::Context::new();

    match VisionClient::new(&zmq_ctx, &net_params, publishers) {
        Ok(c) => {
            info!("VisionClient initialised");
            Some(c)
        }
        Err(e) => {
            warn!("Could not initialise the VisionClient ({}), running on odometry only", e);
            None
        }
    }
}
