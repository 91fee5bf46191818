// THEORY:
// The `transport` module holds the edges of the servo loop: where frames come
// from and where velocity commands go. The vision core never names a concrete
// transport; it sees a stream of `ImageMessage`s on one side and a
// `VelocitySink` on the other.
//
// Bundled adapters:
// - `DirectorySource` replays the image files of a directory as a paced, looping
//   camera feed. Files that fail to decode surface as `Err` items, exactly like
//   a corrupt message from a live camera would.
// - `LogSink` writes each command as a structured `tracing` event.
// - `BusSink` fans commands out over a `tokio::sync::broadcast` channel so any
//   number of consumers (a motor driver, a recorder, a test) can subscribe.

use crate::core_modules::frame::{Encoding, ImageMessage};
use crate::core_modules::velocity::VelocityCommand;
use crate::error::Result;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, trace, warn};

/// File extensions `DirectorySource` will try to decode.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff", "webp"];

/// Anything that can be turned into a push stream of raw frames.
pub trait FrameSource {
    fn frames(self) -> BoxStream<'static, Result<ImageMessage>>;
}

/// Destination of velocity commands.
pub trait VelocitySink: Send + Sync {
    fn publish(&self, command: VelocityCommand) -> Result<()>;
}

impl<T: VelocitySink + ?Sized> VelocitySink for Arc<T> {
    fn publish(&self, command: VelocityCommand) -> Result<()> {
        (**self).publish(command)
    }
}

impl<T: VelocitySink + ?Sized> VelocitySink for Box<T> {
    fn publish(&self, command: VelocityCommand) -> Result<()> {
        (**self).publish(command)
    }
}

/// Replays the image files of a directory, sorted by file name.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    paths: Vec<PathBuf>,
    interval: Duration,
    looping: bool,
}

impl DirectorySource {
    /// Lists the images in `dir`. The directory is read once, here.
    pub fn new(dir: impl AsRef<Path>, interval: Duration) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();
        if paths.is_empty() {
            warn!(dir = %dir.as_ref().display(), "no image files found");
        }
        Ok(Self {
            paths,
            interval,
            looping: true,
        })
    }

    /// Plays every file once and then ends the stream.
    pub fn once(mut self) -> Self {
        self.looping = false;
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

struct Playback {
    paths: Vec<PathBuf>,
    next: usize,
    looping: bool,
    period: Duration,
    ticker: Option<Interval>,
}

impl FrameSource for DirectorySource {
    fn frames(self) -> BoxStream<'static, Result<ImageMessage>> {
        let playback = Playback {
            paths: self.paths,
            next: 0,
            looping: self.looping,
            period: self.interval,
            ticker: None,
        };

        stream::unfold(playback, |mut pb| async move {
            if pb.paths.is_empty() || (!pb.looping && pb.next >= pb.paths.len()) {
                return None;
            }
            // Created lazily so the interval binds to the runtime polling the stream.
            let period = pb.period.max(Duration::from_millis(1));
            let ticker = pb.ticker.get_or_insert_with(|| {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            ticker.tick().await;

            let path = pb.paths[pb.next % pb.paths.len()].clone();
            pb.next += 1;
            let item = match tokio::task::spawn_blocking(move || load_image_message(&path)).await {
                Ok(item) => item,
                Err(e) => Err(std::io::Error::other(e).into()),
            };
            Some((item, pb))
        })
        .boxed()
    }
}

/// Decodes an image file into a packed `rgb8` message.
pub fn load_image_message(path: &Path) -> Result<ImageMessage> {
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(ImageMessage::packed(width, height, Encoding::Rgb8, rgb.into_raw()))
}

/// Logs every command as a structured event on its topic.
#[derive(Debug, Clone)]
pub struct LogSink {
    topic: String,
}

impl LogSink {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into() }
    }
}

impl VelocitySink for LogSink {
    fn publish(&self, command: VelocityCommand) -> Result<()> {
        info!(topic = %self.topic, linear = command.linear, angular = command.angular, "velocity command");
        Ok(())
    }
}

/// Broadcasts every command to all current subscribers.
#[derive(Debug, Clone)]
pub struct BusSink {
    topic: String,
    tx: broadcast::Sender<VelocityCommand>,
}

impl BusSink {
    pub fn new(topic: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            topic: topic.into(),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VelocityCommand> {
        self.tx.subscribe()
    }
}

impl VelocitySink for BusSink {
    fn publish(&self, command: VelocityCommand) -> Result<()> {
        // Nobody listening is not a failure; the command is simply dropped.
        let receivers = self.tx.send(command).unwrap_or(0);
        trace!(topic = %self.topic, receivers, linear = command.linear, angular = command.angular, "velocity command");
        Ok(())
    }
}
