//! Rotated-rectangle geometry: corners, polygon clipping, and IoU.
//!
//! `rotated_iou` is the single source of truth for overlap in this crate.
//! The intersection of two rotated rectangles is computed exactly by clipping
//! one quadrilateral against the half-planes of the other
//! (Sutherland-Hodgman) and measuring the clipped polygon with the shoelace
//! formula. No axis-aligned approximation is ever substituted.

use bytemuck::{Pod, Zeroable};

/// Number of f32 values encoding one rotated box in packed input/output
/// arrays.
pub const FLOATS_PER_BOX: usize = 6;

/// A rotated rectangle with an opaque auxiliary payload.
///
/// The five geometric fields are center coordinates, width, height and the
/// rotation angle in radians (counter-clockwise). `aux` is defined by the
/// upstream decoder; the engine copies it through without reading it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RotatedBox {
    /// Center x coordinate.
    pub x: f32,
    /// Center y coordinate.
    pub y: f32,
    /// Full width along the box's local x axis.
    pub width: f32,
    /// Full height along the box's local y axis.
    pub height: f32,
    /// Rotation angle in radians, counter-clockwise.
    pub angle: f32,
    /// Opaque payload owned by the upstream decoder.
    pub aux: f32,
}

impl RotatedBox {
    /// Creates a box with a zeroed auxiliary field.
    pub fn new(x: f32, y: f32, width: f32, height: f32, angle: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            angle,
            aux: 0.0,
        }
    }

    /// Returns the rectangle area.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Returns the four corners in counter-clockwise order.
    pub fn corners(&self) -> [[f32; 2]; 4] {
        let (sin, cos) = self.angle.sin_cos();
        let hw = 0.5 * self.width;
        let hh = 0.5 * self.height;
        let local = [[-hw, -hh], [hw, -hh], [hw, hh], [-hw, hh]];
        local.map(|[lx, ly]| {
            [
                self.x + lx * cos - ly * sin,
                self.y + lx * sin + ly * cos,
            ]
        })
    }
}

// Clipping a convex quad against four half-planes grows the vertex count by
// at most one per plane, so eight vertices bound the intersection polygon.
const MAX_VERTS: usize = 8;

#[derive(Clone, Copy)]
struct ClipPolygon {
    verts: [[f32; 2]; MAX_VERTS],
    len: usize,
}

impl ClipPolygon {
    fn from_corners(corners: [[f32; 2]; 4]) -> Self {
        let mut verts = [[0.0f32; 2]; MAX_VERTS];
        verts[..4].copy_from_slice(&corners);
        Self { verts, len: 4 }
    }

    fn push(&mut self, vert: [f32; 2]) {
        debug_assert!(self.len < MAX_VERTS);
        self.verts[self.len] = vert;
        self.len += 1;
    }
}

fn cross(origin: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    (a[0] - origin[0]) * (b[1] - origin[1]) - (a[1] - origin[1]) * (b[0] - origin[0])
}

/// Clips `poly` against the half-plane left of the directed edge `a -> b`.
fn clip_against_edge(poly: &ClipPolygon, a: [f32; 2], b: [f32; 2]) -> ClipPolygon {
    let mut out = ClipPolygon {
        verts: [[0.0; 2]; MAX_VERTS],
        len: 0,
    };
    if poly.len == 0 {
        return out;
    }

    let mut prev = poly.verts[poly.len - 1];
    let mut prev_side = cross(a, b, prev);
    for i in 0..poly.len {
        let curr = poly.verts[i];
        let curr_side = cross(a, b, curr);
        if curr_side >= 0.0 {
            if prev_side < 0.0 {
                out.push(intersect_point(prev, curr, prev_side, curr_side));
            }
            out.push(curr);
        } else if prev_side >= 0.0 {
            out.push(intersect_point(prev, curr, prev_side, curr_side));
        }
        prev = curr;
        prev_side = curr_side;
    }
    out
}

/// Point where segment `p -> q` crosses the clip line, given the signed
/// distances of its endpoints.
fn intersect_point(p: [f32; 2], q: [f32; 2], side_p: f32, side_q: f32) -> [f32; 2] {
    let t = side_p / (side_p - side_q);
    [p[0] + t * (q[0] - p[0]), p[1] + t * (q[1] - p[1])]
}

/// Signed-area magnitude of a polygon via the shoelace formula.
fn polygon_area(poly: &ClipPolygon) -> f32 {
    if poly.len < 3 {
        return 0.0;
    }
    let mut acc = 0.0f32;
    let mut prev = poly.verts[poly.len - 1];
    for i in 0..poly.len {
        let curr = poly.verts[i];
        acc += prev[0] * curr[1] - curr[0] * prev[1];
        prev = curr;
    }
    0.5 * acc.abs()
}

/// Exact intersection area of two rotated rectangles.
pub fn intersection_area(a: &RotatedBox, b: &RotatedBox) -> f32 {
    let mut poly = ClipPolygon::from_corners(a.corners());
    let clip = b.corners();
    for i in 0..4 {
        let edge_a = clip[i];
        let edge_b = clip[(i + 1) % 4];
        poly = clip_against_edge(&poly, edge_a, edge_b);
        if poly.len < 3 {
            return 0.0;
        }
    }
    polygon_area(&poly)
}

/// Intersection-over-union of two rotated rectangles, in `[0, 1]`.
///
/// Degenerate boxes (zero or negative area) and disjoint boxes yield 0.
/// The function is pure and symmetric in its arguments.
pub fn rotated_iou(a: &RotatedBox, b: &RotatedBox) -> f32 {
    let area_a = a.area();
    let area_b = b.area();
    if !(area_a > 0.0) || !(area_b > 0.0) {
        return 0.0;
    }

    let inter = intersection_area(a, b);
    let union = area_a + area_b - inter;
    if !(union > 0.0) {
        return 0.0;
    }
    let iou = inter / union;
    if iou.is_finite() {
        iou.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
