// THEORY:
// The target state is the only datum shared between the detector and the
// controller. The two run on unrelated clocks (camera frames vs. a fixed timer),
// so the cell is split into a single write half and any number of read halves:
//
// - `TargetState` sits in a `tokio::sync::watch` channel. The detector's
//   `TargetPublisher` is the only sender and swaps the whole value in one
//   `send_replace`; readers copy it out under the channel's lock, so a
//   half-updated (x, y) pair can never be observed. Reads do not consume.
// - `FrameDimensions` sit in a `OnceLock`. The first frame sets them; later
//   frames never touch them. Readers see `None` until that first frame.

use crate::core_modules::frame::FrameDimensions;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;

/// Where the detector last saw the target, in whole pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetState {
    Detected { x: u32, y: u32 },
    #[default]
    NotDetected,
}

impl TargetState {
    pub fn is_detected(&self) -> bool {
        matches!(self, TargetState::Detected { .. })
    }
}

/// A consistent copy of everything the controller reads in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub target: TargetState,
    pub dimensions: Option<FrameDimensions>,
}

/// Write half of the shared target cell. Owned by the detector.
#[derive(Debug)]
pub struct TargetPublisher {
    state: watch::Sender<TargetState>,
    dimensions: Arc<OnceLock<FrameDimensions>>,
}

/// Read half of the shared target cell.
#[derive(Debug, Clone)]
pub struct TargetObserver {
    state: watch::Receiver<TargetState>,
    dimensions: Arc<OnceLock<FrameDimensions>>,
}

/// Creates the shared cell, starting at `NotDetected` with unknown dimensions.
pub fn target_channel() -> (TargetPublisher, TargetObserver) {
    let (tx, rx) = watch::channel(TargetState::NotDetected);
    let dimensions = Arc::new(OnceLock::new());
    (
        TargetPublisher {
            state: tx,
            dimensions: dimensions.clone(),
        },
        TargetObserver {
            state: rx,
            dimensions,
        },
    )
}

impl TargetPublisher {
    /// Overwrites the current target. Succeeds even with no readers left.
    pub fn publish(&self, target: TargetState) {
        self.state.send_replace(target);
    }

    /// Records the frame size the first time it is called and returns the
    /// recorded size on every call, whatever `dimensions` is passed later.
    pub fn record_dimensions(&self, dimensions: FrameDimensions) -> FrameDimensions {
        *self.dimensions.get_or_init(|| dimensions)
    }

    /// Another reader on the same cell.
    pub fn subscribe(&self) -> TargetObserver {
        TargetObserver {
            state: self.state.subscribe(),
            dimensions: self.dimensions.clone(),
        }
    }
}

impl TargetObserver {
    pub fn target(&self) -> TargetState {
        *self.state.borrow()
    }

    pub fn dimensions(&self) -> Option<FrameDimensions> {
        self.dimensions.get().copied()
    }

    pub fn observe(&self) -> Observation {
        Observation {
            target: self.target(),
            dimensions: self.dimensions(),
        }
    }

    /// Waits until the detector publishes again. Errors once the publisher is gone.
    pub async fn changed(&mut self) -> Result<TargetState, watch::error::RecvError> {
        self.state.changed().await?;
        Ok(*self.state.borrow_and_update())
    }
}
