//! Mesh/plane intersection
//!
//! Cuts a triangle set by the plane z = cut, producing the 2D line segments
//! where triangles cross it. Edge crossings use a strict half-open rule
//! (`z < cut` vs `z >= cut`), so an edge shared by two triangles contributes
//! the same crossing to both and a vertex lying exactly on the plane is
//! counted on the `>=` side. A triangle therefore yields exactly 0 or 2
//! crossings; triangles lying entirely in the plane yield none.

/// A 2D segment in slice coordinates: endpoints `[x, y]`.
pub(super) type Segment2 = [[f64; 2]; 2];

pub(super) fn slice_segments(
    points: &[[f64; 3]],
    polys: &[[usize; 3]],
    cut: f64,
) -> Vec<Segment2> {
    let mut segments = Vec::new();

    for poly in polys {
        let mut crossings = [[0.0f64; 2]; 2];
        let mut found = 0;

        for e in 0..3 {
            let a = points[poly[e]];
            let b = points[poly[(e + 1) % 3]];
            if (a[2] < cut) != (b[2] < cut) {
                // Denominator is nonzero: a and b are on strictly different
                // sides of the plane.
                let t = (cut - a[2]) / (b[2] - a[2]);
                if found < 2 {
                    crossings[found] = [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])];
                }
                found += 1;
            }
        }

        if found == 2 {
            segments.push(crossings);
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_crossing_plane() {
        // Triangle spanning z = -1 .. 1, cut at z = 0
        let points = vec![[0.0, 0.0, -1.0], [2.0, 0.0, 1.0], [0.0, 2.0, 1.0]];
        let segs = slice_segments(&points, &[[0, 1, 2]], 0.0);
        assert_eq!(segs.len(), 1);

        // Both crossings are at edge midpoints
        let seg = segs[0];
        assert!((seg[0][0] - 1.0).abs() < 1e-12 && seg[0][1].abs() < 1e-12);
        assert!(seg[1][0].abs() < 1e-12 && (seg[1][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_triangle_not_crossing() {
        let points = vec![[0.0, 0.0, 1.0], [1.0, 0.0, 2.0], [0.0, 1.0, 3.0]];
        assert!(slice_segments(&points, &[[0, 1, 2]], 0.0).is_empty());
        assert!(slice_segments(&points, &[[0, 1, 2]], 5.0).is_empty());
    }

    #[test]
    fn test_in_plane_triangle_ignored() {
        let points = vec![[0.0, 0.0, 2.0], [1.0, 0.0, 2.0], [0.0, 1.0, 2.0]];
        // All vertices on the >= side: no edge crosses.
        assert!(slice_segments(&points, &[[0, 1, 2]], 2.0).is_empty());
    }

    #[test]
    fn test_vertex_on_plane_counts_once() {
        // One vertex exactly on the cut, the others on opposite sides:
        // exactly two crossings (one of them at the on-plane vertex).
        let points = vec![[0.0, 0.0, 0.0], [2.0, 0.0, -1.0], [0.0, 2.0, 1.0]];
        let segs = slice_segments(&points, &[[0, 1, 2]], 0.0);
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn test_two_triangles_two_segments() {
        let points = vec![
            [0.0, 0.0, -1.0],
            [1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [5.0, 5.0, -2.0],
            [6.0, 5.0, 2.0],
            [5.0, 6.0, 2.0],
        ];
        let segs = slice_segments(&points, &[[0, 1, 2], [3, 4, 5]], 0.0);
        assert_eq!(segs.len(), 2);
    }
}
