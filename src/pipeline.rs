// THEORY:
// The `pipeline` module is the top-level API of the servo loop. A `ServoNode`
// owns the two halves of the loop and the cell between them, and `run` drives
// them from two unrelated clocks:
//
// - Frame clock: a transport stream pushes `ImageMessage`s into a bounded
//   keep-last buffer. When the buffer is full the oldest frame is evicted, so a
//   slow detector never backs up into the transport and always moves on to the
//   freshest image. A detection task drains the buffer and runs each pass on the
//   blocking pool, keeping pixel work off the async workers.
// - Control clock: a fixed `tokio::time::interval` ticks the controller, which
//   reads whatever the detector last wrote and publishes one command.
//
// Nothing but the shared target cell crosses between the two, so a stalled
// detection pass delays no control tick. Shutdown is a `watch<bool>` flag; when
// it flips, the control loop publishes a final stop command so the robot is not
// left spinning in search mode, and the frame side winds down behind it.

use crate::config::SeekerConfig;
use crate::core_modules::controller::Controller;
use crate::core_modules::frame::ImageMessage;
use crate::core_modules::target_detector::TargetDetector;
use crate::core_modules::target_state::{TargetObserver, target_channel};
use crate::error::{Result, SeekerError};
use crate::transport::VelocitySink;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Notify, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::frame::{Frame, FrameDimensions};
pub use crate::core_modules::target_state::{Observation, TargetState};
pub use crate::core_modules::velocity::VelocityCommand;

/// Counters collected over one `ServoNode::run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub control_ticks: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub frames_processed: u64,
    pub frames_failed: u64,
    pub detections: u64,
}

#[derive(Default)]
struct Counters {
    control_ticks: AtomicU64,
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    frames_processed: AtomicU64,
    frames_failed: AtomicU64,
    detections: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            control_ticks: self.control_ticks.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
            detections: self.detections.load(Ordering::Relaxed),
        }
    }
}

/// The complete detector + controller loop.
pub struct ServoNode<S> {
    config: SeekerConfig,
    detector: Arc<TargetDetector>,
    controller: Controller<S>,
    observer: TargetObserver,
}

impl<S: VelocitySink + 'static> ServoNode<S> {
    pub fn new(config: SeekerConfig, sink: S) -> Self {
        let (publisher, observer) = target_channel();
        let detector = Arc::new(TargetDetector::new(config.detector(), publisher));
        let controller = Controller::new(config.gains(), observer.clone(), sink);
        Self {
            config,
            detector,
            controller,
            observer,
        }
    }

    pub fn config(&self) -> &SeekerConfig {
        &self.config
    }

    /// A read handle on the shared target cell.
    pub fn observer(&self) -> TargetObserver {
        self.observer.clone()
    }

    /// Runs until `shutdown` becomes true (or its sender is dropped).
    ///
    /// The end of the frame stream is not a shutdown: the controller keeps
    /// ticking on the last published state.
    pub async fn run<F>(self, frames: F, shutdown: watch::Receiver<bool>) -> Result<RunSummary>
    where
        F: Stream<Item = Result<ImageMessage>> + Send + 'static,
    {
        let counters = Arc::new(Counters::default());
        let queue = Arc::new(FrameQueue::new(self.config.frame_queue_depth));

        info!(
            image_topic = %self.config.image_topic,
            velocity_topic = %self.config.velocity_topic,
            period_ms = self.config.control_period_ms,
            "servo loop starting"
        );

        let ingest = tokio::spawn(ingest_frames(frames, queue.clone(), shutdown.clone(), counters.clone()));
        let detection = tokio::spawn(detect_frames(self.detector.clone(), queue, counters.clone()));

        let mut stop = shutdown;
        let mut ticker = tokio::time::interval(self.config.control_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut stop) => break,
                _ = ticker.tick() => {
                    Counters::bump(&counters.control_ticks);
                    if let Err(e) = self.controller.tick() {
                        warn!(error = %e, "failed to publish velocity command");
                    }
                }
            }
        }

        self.controller.stop()?;
        info!("servo loop stopped, stop command sent");

        ingest.await.map_err(|_| SeekerError::ChannelClosed("frame ingest task"))?;
        detection.await.map_err(|_| SeekerError::ChannelClosed("detection task"))?;

        let summary = counters.summary();
        info!(?summary, "servo loop summary");
        Ok(summary)
    }
}

/// Resolves once the flag reads true or its sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Bounded keep-last frame buffer between the transport and the detector.
///
/// Pushing into a full buffer evicts the oldest frame. Popping waits for a
/// frame and returns `None` once the buffer is closed and drained.
struct FrameQueue {
    frames: Mutex<VecDeque<ImageMessage>>,
    depth: usize,
    ready: Notify,
    closed: AtomicBool,
}

impl FrameQueue {
    fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            frames: Mutex::new(VecDeque::with_capacity(depth)),
            depth,
            ready: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Queues `msg`, returning the frame it evicted, if any.
    fn push(&self, msg: ImageMessage) -> Option<ImageMessage> {
        let evicted = {
            let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
            let evicted = if frames.len() >= self.depth { frames.pop_front() } else { None };
            frames.push_back(msg);
            evicted
        };
        self.ready.notify_one();
        evicted
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.ready.notify_one();
    }

    async fn pop(&self) -> Option<ImageMessage> {
        loop {
            let next = self.frames.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
            if let Some(msg) = next {
                return Some(msg);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            self.ready.notified().await;
        }
    }
}

async fn ingest_frames<F>(
    frames: F,
    queue: Arc<FrameQueue>,
    mut shutdown: watch::Receiver<bool>,
    counters: Arc<Counters>,
) where
    F: Stream<Item = Result<ImageMessage>> + Send + 'static,
{
    let mut frames = Box::pin(frames);
    loop {
        let item = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break,
            item = frames.next() => item,
        };
        let Some(item) = item else {
            debug!("frame stream ended");
            break;
        };
        Counters::bump(&counters.frames_received);
        match item {
            Ok(msg) => {
                if queue.push(msg).is_some() {
                    Counters::bump(&counters.frames_dropped);
                    debug!("frame queue full, evicted the oldest frame");
                }
            }
            Err(e) => {
                Counters::bump(&counters.frames_failed);
                error!(error = %e, "frame could not be received");
            }
        }
    }
    queue.close();
}

async fn detect_frames(detector: Arc<TargetDetector>, queue: Arc<FrameQueue>, counters: Arc<Counters>) {
    while let Some(msg) = queue.pop().await {
        let detector = detector.clone();
        match tokio::task::spawn_blocking(move || detector.process_message(&msg)).await {
            Ok(Ok(target)) => {
                Counters::bump(&counters.frames_processed);
                if target.is_detected() {
                    Counters::bump(&counters.detections);
                }
            }
            Ok(Err(e)) => {
                Counters::bump(&counters.frames_failed);
                error!(error = %e, "frame could not be decoded");
            }
            Err(e) => {
                Counters::bump(&counters.frames_failed);
                error!(error = %e, "detection pass panicked");
            }
        }
    }
}
