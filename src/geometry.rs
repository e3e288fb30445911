/*!
 * Geometric primitives for recognition fusion.
 *
 * Axis-aligned bounding boxes plus the overlap measures the aligners score
 * with: intersection-over-union for character matching and vertical-band
 * overlap for line matching.
 */

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X-coordinate of the top-left corner
    pub x: f32,
    /// Y-coordinate of the top-left corner
    pub y: f32,
    /// Width of the box
    pub w: f32,
    /// Height of the box
    pub h: f32,
}

impl BoundingBox {
    /// Create a new bounding box from top-left corner and size.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Smallest axis-aligned box enclosing a polygon.
    ///
    /// Returns a zero-area box at the origin for an empty polygon.
    pub fn from_polygon(points: &[(f32, f32)]) -> Self {
        if points.is_empty() {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for &(px, py) in points {
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Bottom edge y-coordinate.
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    /// Vertical center.
    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    /// Box area; zero for degenerate boxes.
    pub fn area(&self) -> f32 {
        (self.w.max(0.0)) * (self.h.max(0.0))
    }

    /// Intersection-over-union with another box.
    ///
    /// Returns 0.0 when the boxes are disjoint or both degenerate.
    pub fn iou(&self, other: &Self) -> f32 {
        let ix = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let iy = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Overlap of the vertical bands of two boxes, as a fraction of the
    /// smaller height.
    ///
    /// 1.0 means one band fully contains the other; 0.0 means disjoint bands.
    pub fn vertical_overlap(&self, other: &Self) -> f32 {
        let overlap = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        let min_h = self.h.min(other.h);
        if min_h <= 0.0 {
            0.0
        } else {
            (overlap / min_h).min(1.0)
        }
    }

    /// Mean of a non-empty set of boxes, component-wise.
    ///
    /// The fused box of an aligned position is the average of its
    /// contributing boxes.
    pub fn mean_of(boxes: &[Self]) -> Self {
        if boxes.is_empty() {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }
        let n = boxes.len() as f32;
        let mut acc = (0.0, 0.0, 0.0, 0.0);
        for b in boxes {
            acc.0 += b.x;
            acc.1 += b.y;
            acc.2 += b.w;
            acc.3 += b.h;
        }
        Self::new(acc.0 / n, acc.1 / n, acc.2 / n, acc.3 / n)
    }

    /// Split the box into `count` equal slices along its dominant axis.
    ///
    /// Used by the normalizer to divide a multi-character run's box between
    /// its characters. Horizontal runs split left-to-right, vertical runs
    /// top-to-bottom. `count` of zero yields an empty vector.
    pub fn split_along_dominant_axis(&self, count: usize) -> Vec<Self> {
        if count == 0 {
            return Vec::new();
        }
        let n = count as f32;
        if self.w >= self.h {
            let slice_w = self.w / n;
            (0..count)
                .map(|i| Self::new(self.x + slice_w * i as f32, self.y, slice_w, self.h))
                .collect()
        } else {
            let slice_h = self.h / n;
            (0..count)
                .map(|i| Self::new(self.x, self.y + slice_h * i as f32, self.w, slice_h))
                .collect()
        }
    }
}
