//! # Vision Equipment Communications Module
//!
//! The vision coprocessor detects fiducial tags in each camera's image and publishes three
//! independent streams per camera: the tag translation vector, the flattened rotation matrix, and
//! the tag id. Each published value carries the capture timestamp of the detection it belongs to.
//!
//! On the robot side each stream lands in a bounded queue which is only ever drained, never
//! waited on, so a stalled coprocessor can never hold up the control cycle. A full queue evicts
//! its oldest value so the freshest detections survive.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Depth of each per-topic observation queue.
pub const OBS_QUEUE_DEPTH: usize = 10;

/// Tag id published by the frontend when nothing was detected.
pub const NO_DETECTION_ID: i64 = 0;

/// Number of elements in a valid translation vector.
pub const TVEC_LEN: usize = 3;

/// Number of elements in a valid flattened (row-major) rotation matrix.
pub const RVEC_LEN: usize = 9;

/// Number of elements in the placeholder vectors published when nothing was detected.
pub const PLACEHOLDER_LEN: usize = 1;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A value tagged with the capture timestamp of the detection it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    /// The value itself
    pub value: T,

    /// Capture timestamp on the shared robot clock.
    ///
    /// Units: microseconds
    pub timestamp_us: u64,
}

/// A single message published by the vision coprocessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMsg {
    /// Index of the camera which made the observation
    pub cam_idx: usize,

    /// Capture timestamp of the detection.
    ///
    /// Units: microseconds
    pub timestamp_us: u64,

    /// The observed data
    pub data: ObservationData,
}

/// Buffer shared by the two halves of a stream.
struct Shared<T> {
    buf: Mutex<VecDeque<Timestamped<T>>>,
    depth: usize,
}

/// Sending half of a single observation stream.
pub struct ObservationSender<T> {
    shared: Arc<Shared<T>>,
}

/// Receiving half of a single observation stream.
pub struct ObservationQueue<T> {
    shared: Arc<Shared<T>>,
}

/// Publishing side of the three streams for one camera.
pub struct CamPublisher {
    pub tvec: ObservationSender<Vec<f64>>,
    pub rvec: ObservationSender<Vec<f64>>,
    pub ids: ObservationSender<i64>,
}

/// Consuming side of the three streams for one camera.
pub struct CamQueues {
    pub tvec: ObservationQueue<Vec<f64>>,
    pub rvec: ObservationQueue<Vec<f64>>,
    pub ids: ObservationQueue<i64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The data carried by an observation message, one variant per stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topic", content = "value")]
pub enum ObservationData {
    /// Position of the tag in the camera frame (x right, y down, z forward).
    ///
    /// Units: meters
    #[serde(rename = "tvec")]
    Translation(Vec<f64>),

    /// Row-major rotation matrix of the tag in the camera frame.
    #[serde(rename = "rvec")]
    Rotation(Vec<f64>),

    /// Id of the detected tag, [`NO_DETECTION_ID`] if none.
    #[serde(rename = "id")]
    TagId(i64),
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("The other end of the queue has been dropped")]
    Disconnected,
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    /// There was room for the value.
    Queued,

    /// The queue was full, the oldest value was evicted to make room.
    EvictedOldest,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T> Shared<T> {
    /// True if the other half of the stream has been dropped.
    fn peer_dropped(self: &Arc<Self>) -> bool {
        Arc::strong_count(self) < 2
    }
}

impl<T> ObservationSender<T> {
    /// Publish a value into the queue without blocking.
    ///
    /// If the queue is full the oldest value is evicted.
    pub fn publish(&self, value: T, timestamp_us: u64) -> Result<Published, QueueError> {
        if self.shared.peer_dropped() {
            return Err(QueueError::Disconnected);
        }

        let mut buf = self
            .shared
            .buf
            .lock()
            .map_err(|_| QueueError::Disconnected)?;

        let mut published = Published::Queued;
        while buf.len() >= self.shared.depth {
            buf.pop_front();
            published = Published::EvictedOldest;
        }

        buf.push_back(Timestamped {
            value,
            timestamp_us,
        });

        Ok(published)
    }
}

impl<T> ObservationQueue<T> {
    /// Take every value currently in the queue, in arrival order.
    ///
    /// Never blocks. An empty vector means nothing new arrived. `QueueError::Disconnected` is
    /// only returned once all values published before the sender went away have been drained.
    pub fn drain(&self) -> Result<Vec<Timestamped<T>>, QueueError> {
        let mut buf = self
            .shared
            .buf
            .lock()
            .map_err(|_| QueueError::Disconnected)?;

        if buf.is_empty() && self.shared.peer_dropped() {
            return Err(QueueError::Disconnected);
        }

        Ok(buf.drain(..).collect())
    }
}

impl ObservationData {
    /// Return true if the data has a shape the frontend can publish, either a full vector or the
    /// no-detection placeholder.
    pub fn is_well_formed(&self) -> bool {
        match self {
            ObservationData::Translation(v) => v.len() == TVEC_LEN || v.len() == PLACEHOLDER_LEN,
            ObservationData::Rotation(v) => v.len() == RVEC_LEN || v.len() == PLACEHOLDER_LEN,
            ObservationData::TagId(id) => *id >= NO_DETECTION_ID,
        }
    }
}

impl CamPublisher {
    /// Route an observation to the stream it belongs to.
    pub fn publish(
        &self,
        data: ObservationData,
        timestamp_us: u64,
    ) -> Result<Published, QueueError> {
        match data {
            ObservationData::Translation(v) => self.tvec.publish(v, timestamp_us),
            ObservationData::Rotation(v) => self.rvec.publish(v, timestamp_us),
            ObservationData::TagId(id) => self.ids.publish(id, timestamp_us),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a bounded observation stream with the given depth.
///
/// A depth of zero is treated as one.
pub fn observation_channel<T>(depth: usize) -> (ObservationSender<T>, ObservationQueue<T>) {
    let shared = Arc::new(Shared {
        buf: Mutex::new(VecDeque::with_capacity(depth.max(1))),
        depth: depth.max(1),
    });

    (
        ObservationSender {
            shared: shared.clone(),
        },
        ObservationQueue { shared },
    )
}

/// Create the three streams for one camera.
pub fn cam_channel(depth: usize) -> (CamPublisher, CamQueues) {
    let (tvec_tx, tvec_rx) = observation_channel(depth);
    let (rvec_tx, rvec_rx) = observation_channel(depth);
    let (ids_tx, ids_rx) = observation_channel(depth);

    (
        CamPublisher {
            tvec: tvec_tx,
            rvec: rvec_tx,
            ids: ids_tx,
        },
        CamQueues {
            tvec: tvec_rx,
            rvec: rvec_rx,
            ids: ids_rx,
        },
    )
}
