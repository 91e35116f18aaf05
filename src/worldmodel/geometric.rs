//! Collision Geometry
//!
//! Pure overlap tests shared by placement, motion and every search strategy.
//! Rectangles are axis-aligned and stored as centre plus half-extents.

use serde::{Deserialize, Serialize};

/// A position in arena coordinates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Tagged footprint of an entity, used by the box-overlap test.
///
/// Circles take their radius as the half-extent on both axes, so the overlap
/// test is always a bounding-box test.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { x: f64, y: f64, r: f64 },
    Rect { x: f64, y: f64, half_w: f64, half_h: f64 },
}

impl Shape {
    pub fn center(&self) -> Point {
        match *self {
            Shape::Circle { x, y, .. } | Shape::Rect { x, y, .. } => Point::new(x, y),
        }
    }

    pub fn half_extents(&self) -> (f64, f64) {
        match *self {
            Shape::Circle { r, .. } => (r, r),
            Shape::Rect { half_w, half_h, .. } => (half_w, half_h),
        }
    }

    /// Box overlap on both axes, strict on each.
    pub fn overlaps(&self, other: &Shape) -> bool {
        let a = self.center();
        let b = other.center();
        let (aw, ah) = self.half_extents();
        let (bw, bh) = other.half_extents();
        rects_overlap(a.x, a.y, aw, ah, b.x, b.y, bw, bh)
    }
}

/// True iff the circle reaches strictly inside the rectangle's closest point.
#[inline]
pub fn circle_intersects_rect(
    cx: f64,
    cy: f64,
    r: f64,
    rect_cx: f64,
    rect_cy: f64,
    half_w: f64,
    half_h: f64,
) -> bool {
    let closest_x = cx.clamp(rect_cx - half_w, rect_cx + half_w);
    let closest_y = cy.clamp(rect_cy - half_h, rect_cy + half_h);
    (cx - closest_x).hypot(cy - closest_y) < r
}

#[inline]
pub fn circle_intersects_circle(ax: f64, ay: f64, ar: f64, bx: f64, by: f64, br: f64) -> bool {
    (ax - bx).hypot(ay - by) < ar + br
}

/// Axis-aligned box test: both axes must overlap strictly.
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn rects_overlap(
    ax: f64,
    ay: f64,
    a_half_w: f64,
    a_half_h: f64,
    bx: f64,
    by: f64,
    b_half_w: f64,
    b_half_h: f64,
) -> bool {
    (ax - bx).abs() < a_half_w + b_half_w && (ay - by).abs() < a_half_h + b_half_h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_inside_rect_hits() {
        assert!(circle_intersects_rect(10.0, 10.0, 1.0, 10.0, 10.0, 3.0, 3.0));
    }

    #[test]
    fn circle_touching_edge_does_not_hit() {
        // Closest point is exactly `r` away
        assert!(!circle_intersects_rect(5.0, 10.0, 2.0, 10.0, 10.0, 3.0, 3.0));
        assert!(circle_intersects_rect(5.1, 10.0, 2.0, 10.0, 10.0, 3.0, 3.0));
    }

    #[test]
    fn circle_near_corner_uses_euclidean_distance() {
        // Corner at (13, 13); centre (14, 14) is sqrt(2) away
        assert!(!circle_intersects_rect(14.0, 14.0, 1.4, 10.0, 10.0, 3.0, 3.0));
        assert!(circle_intersects_rect(14.0, 14.0, 1.5, 10.0, 10.0, 3.0, 3.0));
    }

    #[test]
    fn circles_overlap_strictly() {
        assert!(circle_intersects_circle(0.0, 0.0, 1.0, 1.5, 0.0, 1.0));
        assert!(!circle_intersects_circle(0.0, 0.0, 1.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn rects_sharing_an_edge_do_not_overlap() {
        assert!(!rects_overlap(0.0, 0.0, 2.0, 2.0, 4.0, 0.0, 2.0, 2.0));
        assert!(rects_overlap(0.0, 0.0, 2.0, 2.0, 3.9, 0.0, 2.0, 2.0));
    }

    #[test]
    fn rects_need_both_axes() {
        assert!(!rects_overlap(0.0, 0.0, 2.0, 2.0, 1.0, 10.0, 2.0, 2.0));
    }

    #[test]
    fn shape_dispatch_treats_circle_as_box() {
        let circle = Shape::Circle { x: 0.0, y: 0.0, r: 1.0 };
        let rect = Shape::Rect { x: 1.9, y: 1.9, half_w: 1.0, half_h: 1.0 };
        // Diagonal gap that a true circle test would reject
        assert!(circle.overlaps(&rect));
        assert!(rect.overlaps(&circle));
    }
}
