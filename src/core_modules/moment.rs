// THEORY:
// Spatial moments of the area enclosed by a closed boundary polygon. By Green's
// theorem the area integrals reduce to sums over the polygon edges:
//   m00 = 1/2 * sum(x_i * y_j - x_j * y_i)
//   m10 = 1/6 * sum((x_i + x_j) * (x_i * y_j - x_j * y_i))
//   m01 = 1/6 * sum((y_i + y_j) * (x_i * y_j - x_j * y_i))
// with j = i + 1 wrapping around. Anything inside the boundary counts, holes
// included, so a highlight punched out of a ball's mask does not move its
// centroid. (m10 / m00, m01 / m00) is the centroid; only the zeroth and first
// orders are kept.
//
// The sums are taken over integer vertices in i64 and divided once at the end.
// A boundary that is symmetric about an integer point therefore yields that
// point exactly, with no rounding drift ahead of the integer cast downstream.

use crate::core_modules::smart_blob::Point;

/// Zeroth and first-order area moments of one region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// Moments of the area enclosed by the closed polygon `vertices`.
    ///
    /// Orientation does not matter; a clockwise polygon gives the same
    /// (positive) area as its counter-clockwise twin. Fewer than three
    /// vertices, or collinear ones, enclose nothing.
    pub fn from_polygon(vertices: &[Point]) -> Self {
        let (mut a, mut sx, mut sy) = (0i64, 0i64, 0i64);
        for (i, p) in vertices.iter().enumerate() {
            let q = vertices[(i + 1) % vertices.len()];
            let (xi, yi) = (i64::from(p.x), i64::from(p.y));
            let (xj, yj) = (i64::from(q.x), i64::from(q.y));
            let cross = xi * yj - xj * yi;
            a += cross;
            sx += (xi + xj) * cross;
            sy += (yi + yj) * cross;
        }

        let sign = if a < 0 { -1.0 } else { 1.0 };
        Self {
            m00: sign * a as f64 / 2.0,
            m10: sign * sx as f64 / 6.0,
            m01: sign * sy as f64 / 6.0,
        }
    }

    /// The area-weighted center, or `None` for a degenerate region.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00 == 0.0 {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}
