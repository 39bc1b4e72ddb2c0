//! Implementations for the VisionLoc state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::convert::TryFrom;

// Internal
use super::{calc_field_pose, resync, CameraExtrinsics, Params, VisionLocError};
use crate::{
    field_layout::FieldLayout,
    loc::{Pose2D, VisionMeasurement},
};
use comms_if::{
    eqpt::vision::{
        cam_channel, CamPublisher, CamQueues, NO_DETECTION_ID, OBS_QUEUE_DEPTH, RVEC_LEN,
        TVEC_LEN,
    },
    tc::Alliance,
};
use util::{module::State, params, session::Session, time::micros_to_seconds};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vision localisation module state
#[derive(Default)]
pub struct VisionLoc {
    pub(crate) params: Params,

    /// Layout as loaded, relative to the blue origin
    base_layout: Option<FieldLayout>,

    /// Layout for the current alliance
    layout: Option<FieldLayout>,

    alliance: Option<Alliance>,

    cam_queues: Vec<CamQueues>,

    /// Producer ends of the camera queues, until taken by the network client
    cam_publishers: Option<Vec<CamPublisher>>,

    cam_connected: Vec<bool>,

    pub(crate) report: StatusReport,
}

/// Input data to VisionLoc.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Current fused pose estimate
    pub pose: Pose2D,

    /// Current gyro heading in the field frame, the raw gyro plus the estimator's heading offset
    pub gyro_heading_rad: f64,

    /// Whether the robot is enabled. The outlier check only applies while enabled.
    pub enabled: bool,
}

/// Status report for VisionLoc processing.
///
/// Counts are for a single cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Number of paired triples examined
    pub num_triples: usize,
    pub num_accepted: usize,
    pub num_no_detection: usize,
    pub num_mismatched_timestamps: usize,
    pub num_malformed: usize,
    pub num_unknown_tag: usize,
    pub num_non_finite: usize,
    pub num_out_of_bounds: usize,
    pub num_outliers: usize,

    /// Number of cameras which needed resynchronising
    pub num_resyncs: usize,

    /// Entries discarded by resynchronisation
    pub num_resync_dropped: usize,

    /// Cameras skipped because a stream was empty or held the no-detection placeholder
    pub num_skipped_cams: usize,

    pub num_disconnected_cams: usize,

    /// True if there's no field layout, so vision is not used at all
    pub no_layout: bool,
}

/// Reasons a reconstructed pose is not admitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// The pose lies outside the field
    OutOfBounds,

    /// The pose is too far from the current estimate
    Outlier { distance_m: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for VisionLoc {
    type InitData = &'static str;
    type InitError = VisionLocError;

    type InputData = InputData;
    type OutputData = Vec<VisionMeasurement>;
    type StatusReport = StatusReport;
    type ProcError = VisionLocError;

    /// Initialise the VisionLoc module.
    ///
    /// Expected init data is the path to the parameter file. A missing or invalid field layout is
    /// not an error, VisionLoc then produces no measurements and the robot runs on odometry.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        let loaded: Params = params::load(init_data).map_err(VisionLocError::ParamLoadError)?;

        let layout = match params::params_dir()
            .map(|d| d.join(&loaded.field_layout_path))
            .map_err(|e| e.to_string())
            .and_then(|p| FieldLayout::load(p).map_err(|e| e.to_string()))
        {
            Ok(l) => {
                info!("Loaded field layout with {} tags", l.len());
                Some(l)
            }
            Err(e) => {
                warn!(
                    "Could not load the field layout ({}), running on odometry only",
                    e
                );
                None
            }
        };

        *self = Self::with_layout(loaded, layout);

        Ok(())
    }

    /// Perform cyclic processing of VisionLoc.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();
        let mut measurements = Vec::new();

        for (idx, (queues, cam)) in self
            .cam_queues
            .iter()
            .zip(self.params.cameras.iter())
            .enumerate()
        {
            let result = match self.layout.as_ref() {
                Some(layout) => proc_camera(
                    idx,
                    queues,
                    cam,
                    layout,
                    input_data,
                    self.params.max_measurement_diff_m,
                    &mut report,
                ),
                // Keep the queues empty so stale detections aren't used if a layout appears
                None => discard_camera(idx, queues),
            };

            match result {
                Ok(mut m) => {
                    if !self.cam_connected[idx] {
                        info!("Camera {} ({}) reconnected", idx, cam.name);
                        self.cam_connected[idx] = true;
                    }
                    measurements.append(&mut m);
                }
                Err(e) => {
                    if self.cam_connected[idx] {
                        warn!("Camera {} ({}): {}", idx, cam.name, e);
                        self.cam_connected[idx] = false;
                    }
                    report.num_disconnected_cams += 1;
                }
            }
        }

        report.no_layout = self.layout.is_none();
        report.num_accepted = measurements.len();
        self.report = report;

        if !self.cam_queues.is_empty() && report.num_disconnected_cams == self.cam_queues.len() {
            return Err(VisionLocError::AllCamerasDisconnected(self.cam_queues.len()));
        }

        Ok((measurements, report))
    }
}

impl VisionLoc {
    /// Create VisionLoc from parameters and an already loaded layout.
    ///
    /// One set of observation queues is created per camera in the parameters.
    pub fn with_layout(params: Params, layout: Option<FieldLayout>) -> Self {
        let (publishers, queues): (Vec<_>, Vec<_>) = params
            .cameras
            .iter()
            .map(|_| cam_channel(OBS_QUEUE_DEPTH))
            .unzip();
        let num_cams = queues.len();

        Self {
            params,
            base_layout: layout.clone(),
            layout,
            alliance: None,
            cam_queues: queues,
            cam_publishers: Some(publishers),
            cam_connected: vec![true; num_cams],
            report: StatusReport::default(),
        }
    }

    /// Take the producer ends of the camera queues, to hand to the network client.
    ///
    /// Only returns `Some` once.
    pub fn take_publishers(&mut self) -> Option<Vec<CamPublisher>> {
        self.cam_publishers.take()
    }

    /// Set the alliance, selecting the field origin.
    ///
    /// The red alliance uses the mirrored layout.
    pub fn set_alliance(&mut self, alliance: Alliance) {
        if self.alliance != Some(alliance) {
            info!("Alliance set to {:?}", alliance);
        }

        self.alliance = Some(alliance);
        self.layout = self
            .base_layout
            .as_ref()
            .map(|l| l.for_alliance(alliance));
    }

    pub fn alliance(&self) -> Option<Alliance> {
        self.alliance
    }

    /// The layout in use for the current alliance.
    pub fn layout(&self) -> Option<&FieldLayout> {
        self.layout.as_ref()
    }

    pub fn num_cameras(&self) -> usize {
        self.cam_queues.len()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Decide whether a reconstructed pose is plausible.
///
/// The pose must lie strictly inside the field. While enabled it must also lie within
/// `max_diff_m` of the current estimate, while disabled any in-field pose is admitted so the
/// robot can relocalise before a match.
pub fn check_admission(
    candidate: &Pose2D,
    estimate: &Pose2D,
    layout: &FieldLayout,
    enabled: bool,
    max_diff_m: f64,
) -> Result<(), Rejection> {
    if !layout.contains(candidate.x_m, candidate.y_m) {
        return Err(Rejection::OutOfBounds);
    }

    if enabled {
        let distance_m = candidate.distance_to(estimate);
        if !(distance_m < max_diff_m) {
            return Err(Rejection::Outlier { distance_m });
        }
    }

    Ok(())
}

/// Process the streams of a single camera.
fn proc_camera(
    idx: usize,
    queues: &CamQueues,
    cam: &CameraExtrinsics,
    layout: &FieldLayout,
    input: &InputData,
    max_diff_m: f64,
    report: &mut StatusReport,
) -> Result<Vec<VisionMeasurement>, VisionLocError> {
    let disconnected = |_| VisionLocError::CameraDisconnected(idx);
    let mut tvecs = queues.tvec.drain().map_err(disconnected)?;
    let mut rvecs = queues.rvec.drain().map_err(disconnected)?;
    let mut ids = queues.ids.drain().map_err(disconnected)?;

    if tvecs.is_empty() || rvecs.is_empty() || ids.is_empty() {
        report.num_skipped_cams += 1;
        return Ok(Vec::new());
    }

    // The frontend publishes a single element placeholder when it has nothing
    if tvecs[0].value.len() != TVEC_LEN {
        report.num_skipped_cams += 1;
        return Ok(Vec::new());
    }

    if tvecs.len() != rvecs.len() || rvecs.len() != ids.len() {
        trace!(
            "Camera {} streams out of sync (t: {}, r: {}, id: {})",
            idx,
            tvecs.len(),
            rvecs.len(),
            ids.len()
        );
        report.num_resyncs += 1;
        report.num_resync_dropped += resync(&mut tvecs, &mut rvecs, &mut ids);
    }

    let mut measurements = Vec::new();

    for ((t, r), id) in tvecs.iter().zip(rvecs.iter()).zip(ids.iter()) {
        report.num_triples += 1;

        if id.value == NO_DETECTION_ID {
            report.num_no_detection += 1;
            continue;
        }

        if t.timestamp_us != r.timestamp_us || r.timestamp_us != id.timestamp_us {
            trace!(
                "Camera {} mismatched timestamps (t: {}, r: {}, id: {})",
                idx,
                t.timestamp_us,
                r.timestamp_us,
                id.timestamp_us
            );
            report.num_mismatched_timestamps += 1;
            continue;
        }

        let (tvec, rmat) = match (
            <[f64; TVEC_LEN]>::try_from(t.value.as_slice()),
            <[f64; RVEC_LEN]>::try_from(r.value.as_slice()),
        ) {
            (Ok(t), Ok(r)) => (t, r),
            _ => {
                debug!(
                    "Camera {} malformed detection (t: {} elements, r: {} elements)",
                    idx,
                    t.value.len(),
                    r.value.len()
                );
                report.num_malformed += 1;
                continue;
            }
        };

        let tag = match layout.get(id.value) {
            Some(t) => t,
            None => {
                debug!("Camera {} detected tag {} which is not on the field", idx, id.value);
                report.num_unknown_tag += 1;
                continue;
            }
        };

        let sol = match calc_field_pose(tag, &tvec, &rmat, cam, input.gyro_heading_rad) {
            Some(s) => s,
            None => {
                report.num_non_finite += 1;
                continue;
            }
        };

        match check_admission(
            &sol.pose,
            &input.pose,
            layout,
            input.enabled,
            max_diff_m,
        ) {
            Ok(()) => measurements.push(VisionMeasurement {
                pose: sol.pose,
                timestamp_s: micros_to_seconds(id.timestamp_us),
                tag_distance_m: sol.tag_distance_m,
                cam_idx: idx,
                tag_id: id.value,
            }),
            Err(Rejection::OutOfBounds) => {
                trace!("Camera {} tag {} pose off the field: {:?}", idx, id.value, sol.pose);
                report.num_out_of_bounds += 1;
            }
            Err(Rejection::Outlier { distance_m }) => {
                trace!(
                    "Camera {} tag {} pose {:.2} m from the estimate",
                    idx,
                    id.value,
                    distance_m
                );
                report.num_outliers += 1;
            }
        }
    }

    Ok(measurements)
}

/// Drain and discard everything from a camera's streams.
fn discard_camera(
    idx: usize,
    queues: &CamQueues,
) -> Result<Vec<VisionMeasurement>, VisionLocError> {
    let disconnected = |_| VisionLocError::CameraDisconnected(idx);
    queues.tvec.drain().map_err(disconnected)?;
    queues.rvec.drain().map_err(disconnected)?;
    queues.ids.drain().map_err(disconnected)?;

    Ok(Vec::new())
}
