// THEORY:
// The `frame` module is the boundary between the image transport and the vision
// core. Transports deliver an `ImageMessage` (dimensions, an encoding tag, a row
// stride and raw bytes); the detector only ever works on a `Frame`, which is a
// tightly packed BGR8 buffer. The `TryFrom<&ImageMessage>` conversion plays the
// role of a camera "bridge": it validates the buffer, strips padding and alpha,
// and reorders channels. A message that cannot be converted is rejected whole;
// nothing downstream ever sees a partially decoded frame.

use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{Result, SeekerError};
use std::fmt;
use std::str::FromStr;

/// Channel layout of an incoming image message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Bgr8,
    Rgb8,
    Bgra8,
    Rgba8,
}

impl Encoding {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Encoding::Bgr8 | Encoding::Rgb8 => 3,
            Encoding::Bgra8 | Encoding::Rgba8 => 4,
        }
    }

    /// Byte offsets of the blue, green and red channels inside one pixel.
    fn bgr_offsets(self) -> [usize; 3] {
        match self {
            Encoding::Bgr8 | Encoding::Bgra8 => [0, 1, 2],
            Encoding::Rgb8 | Encoding::Rgba8 => [2, 1, 0],
        }
    }
}

impl FromStr for Encoding {
    type Err = SeekerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bgr8" => Ok(Encoding::Bgr8),
            "rgb8" => Ok(Encoding::Rgb8),
            "bgra8" => Ok(Encoding::Bgra8),
            "rgba8" => Ok(Encoding::Rgba8),
            other => Err(SeekerError::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Bgr8 => "bgr8",
            Encoding::Rgb8 => "rgb8",
            Encoding::Bgra8 => "bgra8",
            Encoding::Rgba8 => "rgba8",
        };
        f.write_str(name)
    }
}

/// A raw image as delivered by a transport.
#[derive(Debug, Clone)]
pub struct ImageMessage {
    pub width: u32,
    pub height: u32,
    /// Encoding tag as sent on the wire, e.g. "bgr8".
    pub encoding: String,
    /// Length of one row in bytes, including any padding.
    pub step: usize,
    pub data: Vec<u8>,
}

impl ImageMessage {
    /// Builds a tightly packed message (no row padding).
    pub fn packed(width: u32, height: u32, encoding: Encoding, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            encoding: encoding.to_string(),
            step: width as usize * encoding.bytes_per_pixel(),
            data,
        }
    }
}

/// Width and height of the camera image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

/// A tightly packed height x width x 3 BGR8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * Self::CHANNELS;
        if data.len() != expected {
            return Err(SeekerError::FrameSize {
                encoding: Encoding::Bgr8,
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// A frame where every pixel has the same BGR value.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * Self::CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&bgr);
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions {
            width: self.width,
            height: self.height,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the pixel at (x, y). Panics when out of bounds, like slice indexing.
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        let i = self.index(x, y);
        Pixel::from(&self.data[i..i + Self::CHANNELS])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
        let i = self.index(x, y);
        self.data[i..i + Self::CHANNELS].copy_from_slice(&bgr);
    }

    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.data.chunks_exact(Self::CHANNELS).map(Pixel::from)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) outside {}x{} frame", self.width, self.height);
        (y as usize * self.width as usize + x as usize) * Self::CHANNELS
    }
}

impl TryFrom<&ImageMessage> for Frame {
    type Error = SeekerError;

    fn try_from(msg: &ImageMessage) -> Result<Self> {
        let encoding: Encoding = msg.encoding.parse()?;
        let bpp = encoding.bytes_per_pixel();
        let row_bytes = msg.width as usize * bpp;
        let height = msg.height as usize;

        // The last row may omit its padding. A geometry whose size does not
        // fit in memory at all is reported like any other short buffer.
        let expected = match height.checked_sub(1) {
            None => Some(0),
            Some(rows) => msg.step.checked_mul(rows).and_then(|n| n.checked_add(row_bytes)),
        };
        let fits = expected.is_some_and(|expected| msg.data.len() >= expected);
        if msg.step < row_bytes || !fits {
            return Err(SeekerError::FrameSize {
                encoding,
                width: msg.width,
                height: msg.height,
                expected: msg.step.max(row_bytes).saturating_mul(height),
                actual: msg.data.len(),
            });
        }

        let [b, g, r] = encoding.bgr_offsets();
        let mut data = Vec::with_capacity(msg.width as usize * height * Self::CHANNELS);
        for row in 0..height {
            let start = row * msg.step;
            for px in msg.data[start..start + row_bytes].chunks_exact(bpp) {
                data.extend_from_slice(&[px[b], px[g], px[r]]);
            }
        }

        Ok(Self {
            width: msg.width,
            height: msg.height,
            data,
        })
    }
}
