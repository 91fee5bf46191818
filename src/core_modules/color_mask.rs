// THEORY:
// The `ColorMask` is the output of the segmentation stage: a binary image the
// same size as its source frame in which every pixel is either "target color" or
// "background". Classification is a pure per-pixel test against an inclusive HSV
// box (`HsvRange`), so the mask carries no memory between frames and can be
// rebuilt from scratch for every image.

use crate::core_modules::frame::{Frame, FrameDimensions};
use crate::core_modules::pixel::pixel::Hsv;
use image::{GrayImage, Luma};

/// Inclusive lower/upper HSV bounds defining the target color class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.hue..=self.upper.hue).contains(&hsv.hue)
            && (self.lower.saturation..=self.upper.saturation).contains(&hsv.saturation)
            && (self.lower.value..=self.upper.value).contains(&hsv.value)
    }
}

impl Default for HsvRange {
    /// The yellow-to-orange band a tennis ball or similar sphere falls in.
    fn default() -> Self {
        Self {
            lower: Hsv::new(10, 70, 70),
            upper: Hsv::new(30, 255, 255),
        }
    }
}

/// Per-pixel binary classification of a frame, stored as an 8-bit image with
/// `MASK_SET` for target color and 0 for background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMask {
    image: GrayImage,
}

pub const MASK_SET: u8 = 255;

impl ColorMask {
    /// Classifies every pixel of `frame` against `range`.
    pub fn from_frame(frame: &Frame, range: &HsvRange) -> Self {
        let image = GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            Luma([if range.contains(frame.pixel(x, y).to_hsv()) { MASK_SET } else { 0 }])
        });
        Self { image }
    }

    /// Builds a mask straight from row-major booleans. Used by the blob
    /// detector tests and anywhere a mask is produced by other means.
    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Option<Self> {
        let raw = bits.into_iter().map(|b| if b { MASK_SET } else { 0 }).collect();
        GrayImage::from_raw(width, height, raw).map(|image| Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// The mask surrounded by a one pixel background frame, so a region
    /// touching the image edge still has background on every side.
    pub fn padded(&self) -> GrayImage {
        let mut padded = GrayImage::new(self.width() + 2, self.height() + 2);
        image::imageops::replace(&mut padded, &self.image, 1, 1);
        padded
    }

    pub fn count(&self) -> usize {
        self.image.as_raw().iter().filter(|b| **b == MASK_SET).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.image.as_raw().contains(&MASK_SET)
    }
}
