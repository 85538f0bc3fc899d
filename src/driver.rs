//! The single worker task: pulls input chunks, drives the parser, and
//! publishes whatever the parser produced. See spec §5.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::channel::{Broadcaster, Subscription};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::parser::{ParseOutputs, ParserState};
use crate::segment::SegmentPublisher;
use crate::state::PublishedState;

const INPUT_CHANNEL_CAPACITY: usize = 128;
const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(100);

/// Handle to a running fMP4 stream parser. Construction spawns the
/// [`DriverLoop`]; dropping a `Fmp4Stream` does not itself stop it — call
/// [`Fmp4Stream::stop`] for a clean shutdown.
pub struct Fmp4Stream {
    shared: Arc<Mutex<PublishedState>>,
    broadcaster: Arc<Mutex<Broadcaster>>,
    shutdown: Arc<AtomicBool>,
    join_handle: Arc<tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl Fmp4Stream {
    /// Spawns the driver task and returns the stream handle alongside the
    /// sender half of its input channel. Writing raw fMP4 bytes to the
    /// sender is the caller's responsibility (spec §1: the encoder
    /// subprocess pipeline is out of scope for this crate).
    pub fn spawn(config: Configuration) -> (Self, mpsc::Sender<Bytes>) {
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);

        let shared = Arc::new(Mutex::new(PublishedState::new(&config)));
        let broadcaster = Arc::new(Mutex::new(Broadcaster::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_shared = shared.clone();
        let worker_broadcaster = broadcaster.clone();
        let worker_shutdown = shutdown.clone();
        let hls_enabled = config.hls_enabled();

        let handle = tokio::spawn(driver_loop(
            rx,
            worker_shared,
            worker_broadcaster,
            worker_shutdown,
            hls_enabled,
        ));

        let stream = Self {
            shared,
            broadcaster,
            shutdown,
            join_handle: Arc::new(tokio::sync::Mutex::new(Some(handle))),
        };
        (stream, tx)
    }

    pub fn initialization(&self) -> Option<Bytes> {
        self.shared.lock().initialization()
    }

    pub fn mime(&self) -> Option<String> {
        self.shared.lock().mime()
    }

    pub fn segment(&self) -> Option<Bytes> {
        self.shared.lock().segment()
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.shared.lock().timestamp_ms()
    }

    pub fn duration_s(&self) -> f64 {
        self.shared.lock().duration_s()
    }

    pub fn m3u8(&self) -> Option<String> {
        self.shared.lock().m3u8()
    }

    pub fn sequence(&self) -> i64 {
        self.shared.lock().sequence()
    }

    pub fn buffer_list(&self) -> Option<Vec<Bytes>> {
        self.shared.lock().buffer_list()
    }

    pub fn buffer_list_concat(&self) -> Option<Bytes> {
        self.shared.lock().buffer_list_concat()
    }

    pub fn buffer_concat(&self) -> Option<Bytes> {
        self.shared.lock().buffer_concat()
    }

    pub fn get_hls_segment(&self, sequence: u64) -> Option<Bytes> {
        self.shared.lock().get_hls_segment(sequence)
    }

    pub fn get_hls_named_segment(&self, name: &str) -> Option<Bytes> {
        self.shared.lock().get_hls_named_segment(name)
    }

    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.lock().subscribe()
    }

    /// Requests shutdown and waits for the driver task to exit. Completes
    /// any chunk already in flight first. Calling this more than once is
    /// harmless; only the first call actually joins the task.
    pub async fn stop(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        let mut guard = self.join_handle.lock().await;
        if let Some(handle) = guard.take() {
            handle
                .await
                .map_err(|e| Error::Shutdown(e.to_string()))?;
        }
        Ok(())
    }
}

async fn driver_loop(
    mut rx: mpsc::Receiver<Bytes>,
    shared: Arc<Mutex<PublishedState>>,
    broadcaster: Arc<Mutex<Broadcaster>>,
    shutdown: Arc<AtomicBool>,
    hls_enabled: bool,
) {
    let mut parser = ParserState::new();
    let mut segment_publisher: Option<SegmentPublisher> = None;

    loop {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        match rx.try_recv() {
            Ok(chunk) => {
                let mut outputs = ParseOutputs::default();
                parser.process(chunk, &mut outputs);

                if let Some((init, mime)) = outputs.initialization {
                    segment_publisher = Some(SegmentPublisher::new(now_ms()));
                    shared.lock().set_initialization(init, mime);
                }

                for segment_bytes in outputs.segments {
                    let now = now_ms();
                    let publisher =
                        segment_publisher.get_or_insert_with(|| SegmentPublisher::new(now));
                    let segment = publisher.publish(segment_bytes.clone(), now, hls_enabled);
                    shared.lock().publish_segment(segment);
                    broadcaster.lock().publish(segment_bytes);
                }
            }
            Err(mpsc::error::TryRecvError::Empty) => {
                tokio::time::sleep(EMPTY_READ_BACKOFF).await;
            }
            Err(mpsc::error::TryRecvError::Disconnected) => {
                break;
            }
        }
    }

    broadcaster.lock().close_all();
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_millis() as i64
}
