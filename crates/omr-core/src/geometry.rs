//! Small geometric primitives shared by the rectification and grid stages.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates (`x`, `y` = top-left).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl CellRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.x + 0.5 * self.w, self.y + 0.5 * self.h)
    }

    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    /// Shrink by `frac` of the width/height on every side.
    ///
    /// `inset(0.25)` keeps the central half, i.e. `[1/4, 3/4]` on both axes.
    pub fn inset(&self, frac: f32) -> Self {
        let frac = frac.clamp(0.0, 0.5);
        Self {
            x: self.x + self.w * frac,
            y: self.y + self.h * frac,
            w: self.w * (1.0 - 2.0 * frac),
            h: self.h * (1.0 - 2.0 * frac),
        }
    }

    /// Integer pixel span `[x0, x1) x [y0, y1)` clipped to `width x height`.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn pixel_span(&self, width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
        if !(self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()) {
            return None;
        }
        let x0 = self.x.round().max(0.0) as usize;
        let y0 = self.y.round().max(0.0) as usize;
        let x1 = ((self.x + self.w).round().max(0.0) as usize).min(width);
        let y1 = ((self.y + self.h).round().max(0.0) as usize).min(height);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }

    /// Share of the unclipped pixel span that survives [`Self::pixel_span`].
    pub fn pixel_coverage(&self, width: usize, height: usize) -> f32 {
        let full_w = (self.x + self.w).round() - self.x.round();
        let full_h = (self.y + self.h).round() - self.y.round();
        match self.pixel_span(width, height) {
            Some((x0, y0, x1, y1)) if full_w > 0.0 && full_h > 0.0 => {
                ((x1 - x0) * (y1 - y0)) as f32 / (full_w * full_h)
            }
            _ => 0.0,
        }
    }
}

/// Circle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2<f32>,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Point2<f32>, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Bounding square of the circle.
    pub fn bounds(&self) -> CellRect {
        CellRect::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            2.0 * self.radius,
            2.0 * self.radius,
        )
    }
}

/// Order four corners as top-left, top-right, bottom-right, bottom-left.
///
/// Top-left has the smallest `x + y`, bottom-right the largest; top-right has
/// the smallest `y - x`, bottom-left the largest.
pub fn order_corners(pts: &[Point2<f32>; 4]) -> [Point2<f32>; 4] {
    fn extreme(pts: &[Point2<f32>; 4], key: impl Fn(&Point2<f32>) -> f32, max: bool) -> Point2<f32> {
        let mut best = pts[0];
        for p in &pts[1..] {
            let better = if max {
                key(p) > key(&best)
            } else {
                key(p) < key(&best)
            };
            if better {
                best = *p;
            }
        }
        best
    }
    let sum = |p: &Point2<f32>| p.x + p.y;
    let diff = |p: &Point2<f32>| p.y - p.x;
    [
        extreme(pts, sum, false),
        extreme(pts, diff, false),
        extreme(pts, sum, true),
        extreme(pts, diff, true),
    ]
}

/// Output size of a rectified quad: the longer of each pair of opposing edges.
///
/// Corners must be ordered as produced by [`order_corners`].
pub fn rectified_size(corners: &[Point2<f32>; 4]) -> (usize, usize) {
    let [tl, tr, br, bl] = *corners;
    let width = (tr - tl).norm().max((br - bl).norm());
    let height = (bl - tl).norm().max((br - tr).norm());
    (width.round() as usize, height.round() as usize)
}

/// Unsigned area of a simple polygon (shoelace formula).
pub fn shoelace_area(poly: &[Point2<f32>]) -> f32 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0f64;
    for (i, p) in poly.iter().enumerate() {
        let q = poly[(i + 1) % poly.len()];
        twice += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (twice.abs() * 0.5) as f32
}
