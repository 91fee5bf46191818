// THEORY:
// The `TargetDetector` reduces one camera frame to one `TargetState`. It chains
// the lower layers in a fixed order:
//
//   Frame -> ColorMask (HSV band) -> SmartBlobs (borders) -> largest border
//         -> area gate -> centroid -> TargetState
//
// Size and position come from the area a border encloses, so a target with a
// hole in its mask (a glare spot, a ring) is measured as a whole.
//
// Its only effect is through the shared target cell: every call overwrites it,
// including with `NotDetected`, so the controller never acts on a stale sighting
// once a later frame has been processed. Frame size is recorded from the first
// frame ever seen and then left alone.

use crate::core_modules::blob_detector::blob_detector;
use crate::core_modules::color_mask::{ColorMask, HsvRange};
use crate::core_modules::frame::{Frame, ImageMessage};
use crate::core_modules::target_state::{TargetPublisher, TargetState};
use crate::error::Result;
use tracing::debug;

/// Largest enclosed area, in px², that still counts as noise.
pub const DEFAULT_MIN_BLOB_AREA: usize = 500;

/// Tunables of the segmentation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    pub hsv_range: HsvRange,
    /// A blob must be strictly larger than this to be reported.
    pub min_blob_area: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            hsv_range: HsvRange::default(),
            min_blob_area: DEFAULT_MIN_BLOB_AREA,
        }
    }
}

/// Finds the target in a single frame. Pure: same frame, same answer.
pub fn locate_target(frame: &Frame, config: &DetectorConfig) -> TargetState {
    let mask = ColorMask::from_frame(frame, &config.hsv_range);
    if mask.is_empty() {
        debug!("no target-colored pixels");
        return TargetState::NotDetected;
    }
    let blobs = blob_detector::find_blobs(&mask);

    let Some(largest) = blob_detector::select_largest(&blobs) else {
        debug!("no target-colored regions");
        return TargetState::NotDetected;
    };

    if largest.area <= config.min_blob_area as f64 {
        debug!(area = largest.area, blobs = blobs.len(), "largest region rejected as noise");
        return TargetState::NotDetected;
    }

    match largest.centroid() {
        Some((cx, cy)) => {
            debug!(area = largest.area, blobs = blobs.len(), mask_pixels = mask.count(), cx, cy, "target located");
            // Truncate toward zero; centroids are never negative.
            TargetState::Detected {
                x: cx as u32,
                y: cy as u32,
            }
        }
        None => TargetState::NotDetected,
    }
}

/// Runs `locate_target` on each frame and publishes the result.
#[derive(Debug)]
pub struct TargetDetector {
    config: DetectorConfig,
    publisher: TargetPublisher,
}

impl TargetDetector {
    pub fn new(config: DetectorConfig, publisher: TargetPublisher) -> Self {
        Self { config, publisher }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detects on an already decoded frame and overwrites the shared state.
    pub fn process_frame(&self, frame: &Frame) -> TargetState {
        self.publisher.record_dimensions(frame.dimensions());
        let target = locate_target(frame, &self.config);
        self.publisher.publish(target);
        target
    }

    /// Decodes a transport message and processes it. A message that fails to
    /// decode is returned as an error and the shared state is left untouched.
    pub fn process_message(&self, msg: &ImageMessage) -> Result<TargetState> {
        let frame = Frame::try_from(msg)?;
        Ok(self.process_frame(&frame))
    }
}
