//! # Vision Client
//!
//! The VisionClient receives tag detections from the vision coprocessor and publishes them into
//! the per-camera observation queues read by VisionLoc.
//!
//! The coprocessor publishes one JSON [`ObservationMsg`] per stream entry, as frequently as it
//! can. Messages are received on a background thread so that the control loop never waits on the
//! network. When a queue is full its oldest observation is evicted.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, info, trace, warn};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use comms_if::{
    eqpt::vision::{CamPublisher, ObservationMsg, Published, QueueError},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct VisionClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    num_published: Arc<AtomicUsize>,
    num_rejected: Arc<AtomicUsize>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum VisionClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not deserialize the message from the coprocessor: {0}")]
    DeserializeError(serde_json::Error),

    #[error("Observation for camera {0} but only {1} cameras are configured")]
    InvalidCamera(usize, usize),

    #[error("Malformed observation from camera {0}")]
    MalformedObservation(usize),

    #[error("The queues for camera {0} are no longer being read")]
    QueueDisconnected(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionClient {
    /// Create a new instance of the VisionClient, publishing into the given camera queues.
    ///
    /// The client does not wait for the coprocessor to connect.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        publishers: Vec<CamPublisher>,
    ) -> Result<Self, VisionClientError> {
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.vision_endpoint)
            .map_err(VisionClientError::SocketError)?;

        info!(
            "VisionClient subscribed to {} for {} cameras",
            params.vision_endpoint,
            publishers.len()
        );

        let bg_run = Arc::new(AtomicBool::new(true));
        let num_published = Arc::new(AtomicUsize::new(0));
        let num_rejected = Arc::new(AtomicUsize::new(0));

        let bg_run_clone = bg_run.clone();
        let num_published_clone = num_published.clone();
        let num_rejected_clone = num_rejected.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(
                socket,
                publishers,
                bg_run_clone,
                num_published_clone,
                num_rejected_clone,
            )
        }));

        Ok(Self {
            bg_jh,
            bg_run,
            num_published,
            num_rejected,
        })
    }

    /// Number of observations published into the queues so far.
    pub fn num_published(&self) -> usize {
        self.num_published.load(Ordering::Relaxed)
    }

    /// Number of messages which could not be published.
    pub fn num_rejected(&self) -> usize {
        self.num_rejected.load(Ordering::Relaxed)
    }
}

impl Drop for VisionClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                error!("VisionClient background thread panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse a message from the coprocessor and publish it to the queue it belongs to.
///
/// Returns the camera index along with the publish outcome.
pub fn route_msg(
    msg: &str,
    publishers: &[CamPublisher],
) -> Result<(usize, Published), VisionClientError> {
    let obs: ObservationMsg =
        serde_json::from_str(msg).map_err(VisionClientError::DeserializeError)?;

    let publisher = publishers
        .get(obs.cam_idx)
        .ok_or(VisionClientError::InvalidCamera(obs.cam_idx, publishers.len()))?;

    if !obs.data.is_well_formed() {
        return Err(VisionClientError::MalformedObservation(obs.cam_idx));
    }

    let cam_idx = obs.cam_idx;
    publisher
        .publish(obs.data, obs.timestamp_us)
        .map(|p| (cam_idx, p))
        .map_err(|e| match e {
            QueueError::Disconnected => VisionClientError::QueueDisconnected(cam_idx),
        })
}

/// Background thread, publishes each message from the coprocessor into the queues.
fn bg_thread(
    socket: MonitoredSocket,
    publishers: Vec<CamPublisher>,
    run: Arc<AtomicBool>,
    num_published: Arc<AtomicUsize>,
    num_rejected: Arc<AtomicUsize>,
) {
    let mut was_connected = false;

    while run.load(Ordering::Relaxed) {
        if socket.connected() != was_connected {
            was_connected = !was_connected;
            if was_connected {
                info!("Connected to the vision coprocessor");
            } else {
                warn!("Lost connection to the vision coprocessor");
            }
        }

        let msg = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 message from the vision coprocessor");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving message from the vision coprocessor: {:?}", e);
                break;
            }
        };

        match route_msg(&msg, &publishers) {
            Ok((idx, p)) => {
                if p == Published::EvictedOldest {
                    trace!("Camera {} queue full, oldest observation evicted", idx);
                }
                num_published.fetch_add(1, Ordering::Relaxed);
            }
            Err(VisionClientError::QueueDisconnected(idx)) => {
                // VisionLoc has gone away, nothing left to publish to
                warn!("Camera {} queues disconnected, stopping the VisionClient", idx);
                break;
            }
            Err(e) => {
                debug!("Rejected vision message: {}", e);
                num_rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::vision::{cam_channel, CamQueues};

    fn channels(n: usize, depth: usize) -> (Vec<CamPublisher>, Vec<CamQueues>) {
        (0..n).map(|_| cam_channel(depth)).unzip()
    }

    #[test]
    fn test_route_msg() {
        let (pubs, queues) = channels(2, 10);

        route_msg(
            r#"{"cam_idx": 1, "timestamp_us": 1500, "data": {"topic": "tvec", "value": [0.1, 0.2, 2.0]}}"#,
            &pubs,
        )
        .unwrap();
        route_msg(
            r#"{"cam_idx": 1, "timestamp_us": 1500, "data": {"topic": "id", "value": 4}}"#,
            &pubs,
        )
        .unwrap();

        assert!(queues[0].tvec.drain().unwrap().is_empty());

        let tvecs = queues[1].tvec.drain().unwrap();
        assert_eq!(tvecs.len(), 1);
        assert_eq!(tvecs[0].value, vec![0.1, 0.2, 2.0]);
        assert_eq!(tvecs[0].timestamp_us, 1500);

        let ids = queues[1].ids.drain().unwrap();
        assert_eq!(ids[0].value, 4);
        assert!(queues[1].rvec.drain().unwrap().is_empty());
    }

    #[test]
    fn test_route_placeholder() {
        let (pubs, queues) = channels(1, 10);

        route_msg(
            r#"{"cam_idx": 0, "timestamp_us": 7, "data": {"topic": "rvec", "value": [0.0]}}"#,
            &pubs,
        )
        .unwrap();

        assert_eq!(queues[0].rvec.drain().unwrap()[0].value.len(), 1);
    }

    #[test]
    fn test_route_rejections() {
        let (pubs, _queues) = channels(1, 1);

        match route_msg("not json", &pubs) {
            Err(VisionClientError::DeserializeError(_)) => (),
            r => panic!("Expected a deserialize error, got {:?}", r),
        }

        match route_msg(
            r#"{"cam_idx": 3, "timestamp_us": 0, "data": {"topic": "id", "value": 1}}"#,
            &pubs,
        ) {
            Err(VisionClientError::InvalidCamera(3, 1)) => (),
            r => panic!("Expected an invalid camera, got {:?}", r),
        }

        match route_msg(
            r#"{"cam_idx": 0, "timestamp_us": 0, "data": {"topic": "tvec", "value": [1.0, 2.0]}}"#,
            &pubs,
        ) {
            Err(VisionClientError::MalformedObservation(0)) => (),
            r => panic!("Expected a malformed observation, got {:?}", r),
        }

    }

    #[test]
    fn test_route_full_queue_keeps_newest() {
        let (pubs, queues) = channels(1, 1);

        let first = r#"{"cam_idx": 0, "timestamp_us": 10, "data": {"topic": "id", "value": 1}}"#;
        let second = r#"{"cam_idx": 0, "timestamp_us": 20, "data": {"topic": "id", "value": 2}}"#;

        assert_eq!(route_msg(first, &pubs).unwrap(), (0, Published::Queued));
        assert_eq!(route_msg(second, &pubs).unwrap(), (0, Published::EvictedOldest));

        let ids = queues[0].ids.drain().unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].value, 2);
        assert_eq!(ids[0].timestamp_us, 20);
    }

    #[test]
    fn test_route_disconnected() {
        let (pubs, queues) = channels(1, 10);
        drop(queues);

        match route_msg(
            r#"{"cam_idx": 0, "timestamp_us": 0, "data": {"topic": "id", "value": 1}}"#,
            &pubs,
        ) {
            Err(VisionClientError::QueueDisconnected(0)) => (),
            r => panic!("Expected disconnected queues, got {:?}", r),
        }
    }
}
