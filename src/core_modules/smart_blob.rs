// THEORY:
// A `SmartBlob` is one border of a target-colored region in a single frame,
// described by its boundary polygon. It is a "dumb" data container: it has no
// memory of earlier frames and no notion of identity over time. The blob
// detector fills it in; the target detector only reads `area` and `moments`.
//
// Borders come in two kinds. An outer border wraps a connected region; a hole
// border runs along the inside of a region around an enclosed patch of
// background (a ring seen face-on, a ball with a specular highlight punched out
// of the mask). Both kinds are measured by the area their polygon encloses, so
// an outer border covers its holes, and a region that sits inside another
// region's hole records that hole as its parent.

use crate::core_modules::moment::Moments;

pub use imageproc::contours::BorderType;

/// A simple struct to represent a 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// One outer or hole border of a mask region.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartBlob {
    /// Index of this border in the frame's border list. Borders are listed in
    /// row-major order of the pixel each trace started from. Not persistent
    /// across frames.
    pub id: usize,
    pub border_type: BorderType,
    /// Corner points of the traced border; straight runs keep only their ends.
    pub boundary: Vec<Point>,
    /// Top-left and bottom-right boundary pixels, inclusive.
    pub bounding_box: (Point, Point),
    /// Area enclosed by the boundary polygon, in px².
    pub area: f64,
    pub moments: Moments,
    /// The border directly enclosing this one: the region around a hole, or
    /// the hole a nested region sits in.
    pub parent: Option<usize>,
    /// How many hole borders this border directly encloses.
    pub hole_count: usize,
}

impl SmartBlob {
    pub fn centroid(&self) -> Option<(f64, f64)> {
        self.moments.centroid()
    }

    pub fn is_outermost(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_hole(&self) -> bool {
        self.border_type == BorderType::Hole
    }
}
