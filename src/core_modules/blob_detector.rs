// THEORY:
// The `BlobDetector` is the engine of the Spatial Grouping Layer. It turns a
// binary `ColorMask` into a list of `SmartBlob`s, one per traced border, with
// the full nesting of those borders.
//
// Key architectural principles & algorithm steps:
// 1.  **Border Following**: `imageproc::contours::find_contours` runs Suzuki-Abe
//     border following over the mask. Foreground is 8-connected. Every region
//     yields one outer border and one hole border per enclosed background
//     patch, each tagged with its directly enclosing border. The mask is padded
//     by one background pixel first so regions touching the image edge are
//     closed like any other.
// 2.  **Chain Simplification**: consecutive points on a straight horizontal,
//     vertical or diagonal run collapse to the run's two ends. Collinear points
//     add nothing to the enclosed area or its moments.
// 3.  **Measurement**: area and first-order moments are taken over the polygon
//     each border encloses (see `Moment`), never over individual mask pixels.
// 4.  **Stateless Utility**: `find_blobs` takes one mask and produces the blobs
//     for that mask only. It has no memory of previous frames.

use crate::core_modules::color_mask::ColorMask;
use crate::core_modules::moment::Moments;
use crate::core_modules::smart_blob::{BorderType, Point, SmartBlob};
use imageproc::contours::{Contour, find_contours};

pub mod blob_detector {
    use super::*; // Make structs from parent module available.

    /// Every border of every region in `mask`, in the order the traces were
    /// started by a row-major scan.
    pub fn find_blobs(mask: &ColorMask) -> Vec<SmartBlob> {
        if mask.width() == 0 || mask.height() == 0 {
            return Vec::new();
        }

        // --- 1. Border Following ---
        let contours: Vec<Contour<u32>> = find_contours(&mask.padded());

        let mut hole_counts = vec![0usize; contours.len()];
        for contour in contours.iter().filter(|c| c.border_type == BorderType::Hole) {
            if let Some(parent) = contour.parent {
                hole_counts[parent] += 1;
            }
        }

        // --- 2 & 3. Simplify and Measure ---
        contours
            .into_iter()
            .zip(hole_counts)
            .enumerate()
            .map(|(id, (contour, hole_count))| {
                // Undo the padding offset.
                let traced: Vec<Point> = contour
                    .points
                    .iter()
                    .map(|p| Point {
                        x: p.x.saturating_sub(1),
                        y: p.y.saturating_sub(1),
                    })
                    .collect();
                let boundary = simplify_chain(&traced);
                let moments = Moments::from_polygon(&boundary);
                SmartBlob {
                    id,
                    border_type: contour.border_type,
                    bounding_box: bounding_box(&boundary),
                    area: moments.m00,
                    moments,
                    boundary,
                    parent: contour.parent,
                    hole_count,
                }
            })
            .collect()
    }

    /// The blob with the largest area. On equal areas the blob that comes first
    /// in trace order wins, so repeated runs on one mask always agree.
    pub fn select_largest(blobs: &[SmartBlob]) -> Option<&SmartBlob> {
        blobs.iter().fold(None, |best: Option<&SmartBlob>, blob| match best {
            Some(b) if b.area >= blob.area => Some(b),
            _ => Some(blob),
        })
    }

    /// Drops every point that continues the step direction of the point before
    /// it, treating the chain as closed.
    pub(crate) fn simplify_chain(chain: &[Point]) -> Vec<Point> {
        let n = chain.len();
        if n < 3 {
            return chain.to_vec();
        }
        let step = |from: Point, to: Point| (i64::from(to.x) - i64::from(from.x), i64::from(to.y) - i64::from(from.y));

        (0..n)
            .filter(|&i| {
                let prev = chain[(i + n - 1) % n];
                let next = chain[(i + 1) % n];
                step(prev, chain[i]) != step(chain[i], next)
            })
            .map(|i| chain[i])
            .collect()
    }

    fn bounding_box(points: &[Point]) -> (Point, Point) {
        let mut min = Point { x: u32::MAX, y: u32::MAX };
        let mut max = Point { x: 0, y: 0 };
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::blob_detector::*;
    use super::*;

    /// Parses an ASCII picture: `#` is foreground, anything else background.
    fn mask(rows: &[&str]) -> ColorMask {
        let width = rows[0].len() as u32;
        let bits = rows.iter().flat_map(|r| r.chars().map(|c| c == '#')).collect();
        ColorMask::from_bits(width, rows.len() as u32, bits).unwrap()
    }

    fn holes(blobs: &[SmartBlob]) -> Vec<&SmartBlob> {
        blobs.iter().filter(|b| b.is_hole()).collect()
    }

    #[test]
    fn empty_mask_has_no_blobs() {
        assert!(find_blobs(&mask(&["....", "...."])).is_empty());
    }

    #[test]
    fn diagonal_pixels_form_one_region_without_area() {
        let blobs = find_blobs(&mask(&["#..", ".#.", "..#"]));
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 0.0);
        assert_eq!(blobs[0].centroid(), None);
    }

    #[test]
    fn regions_on_the_image_edge_are_closed() {
        let blobs = find_blobs(&mask(&["####", "####", "####"]));
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].border_type, BorderType::Outer);
        assert_eq!(blobs[0].area, 6.0);
        assert_eq!(blobs[0].bounding_box, (Point { x: 0, y: 0 }, Point { x: 3, y: 2 }));
        assert_eq!(blobs[0].centroid(), Some((1.5, 1.0)));
    }

    #[test]
    fn straight_runs_keep_only_their_corners() {
        let blobs = find_blobs(&mask(&[
            "......",
            ".####.",
            ".####.",
            ".####.",
            "......",
        ]));
        assert_eq!(blobs.len(), 1);
        let mut corners = blobs[0].boundary.clone();
        corners.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            corners,
            vec![Point { x: 1, y: 1 }, Point { x: 4, y: 1 }, Point { x: 1, y: 3 }, Point { x: 4, y: 3 }]
        );
        assert_eq!(blobs[0].area, 6.0);
    }

    #[test]
    fn separate_regions_are_ordered_by_scan_position() {
        let blobs = find_blobs(&mask(&[
            "...##",
            "...##",
            "#....",
            "##...",
        ]));
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].bounding_box, (Point { x: 3, y: 0 }, Point { x: 4, y: 1 }));
        assert_eq!(blobs[0].area, 1.0);
        assert_eq!(blobs[1].area, 0.5);
        assert_eq!(blobs[1].bounding_box, (Point { x: 0, y: 2 }, Point { x: 1, y: 3 }));
    }

    #[test]
    fn ring_with_island_records_topology() {
        let blobs = find_blobs(&mask(&[
            ".......",
            ".#####.",
            ".#...#.",
            ".#.#.#.",
            ".#...#.",
            ".#####.",
            ".......",
        ]));
        let ring = &blobs[0];
        assert_eq!(ring.border_type, BorderType::Outer);
        assert!(ring.is_outermost());
        assert_eq!(ring.hole_count, 1);
        // The outer border encloses the hole and the island as well.
        assert_eq!(ring.area, 16.0);
        assert_eq!(ring.centroid(), Some((3.0, 3.0)));

        let hole = holes(&blobs);
        assert_eq!(hole.len(), 1);
        assert_eq!(hole[0].parent, Some(ring.id));

        let island = blobs
            .iter()
            .find(|b| b.bounding_box == (Point { x: 3, y: 3 }, Point { x: 3, y: 3 }))
            .unwrap();
        assert_eq!(island.border_type, BorderType::Outer);
        assert_eq!(island.parent, Some(hole[0].id));
        assert_eq!(island.area, 0.0);

        assert_eq!(select_largest(&blobs).unwrap().id, ring.id);
    }

    #[test]
    fn background_touching_the_border_is_not_a_hole() {
        let blobs = find_blobs(&mask(&[
            "###",
            "#..",
            "###",
        ]));
        assert!(holes(&blobs).is_empty());
        assert_eq!(blobs[0].hole_count, 0);
    }

    #[test]
    fn diagonal_gap_does_not_leak_a_hole() {
        // The center is enclosed under 8-connected foreground.
        let blobs = find_blobs(&mask(&[
            ".#.",
            "#.#",
            ".#.",
        ]));
        assert_eq!(blobs[0].hole_count, 1);
        assert_eq!(holes(&blobs).len(), 1);
        assert_eq!(blobs[0].area, 2.0);
    }

    #[test]
    fn largest_wins_and_ties_go_to_the_first() {
        let blobs = find_blobs(&mask(&[
            "##.##",
            "##.##",
            ".....",
            "###..",
        ]));
        assert_eq!(blobs.len(), 3);
        let largest = select_largest(&blobs).unwrap();
        assert_eq!(largest.id, 0);
        assert_eq!(largest.area, 1.0);

        let blobs = find_blobs(&mask(&["#.###", "#.###", "#.###"]));
        assert_eq!(select_largest(&blobs).unwrap().area, 4.0);
        assert!(select_largest(&[]).is_none());
    }

    #[test]
    fn simplification_keeps_turns_and_reversals() {
        let p = |x, y| Point { x, y };
        let line = [p(0, 0), p(1, 0), p(2, 0), p(1, 0)];
        assert_eq!(simplify_chain(&line), vec![p(0, 0), p(2, 0)]);
        let single = [p(4, 4)];
        assert_eq!(simplify_chain(&single), vec![p(4, 4)]);
    }
}
