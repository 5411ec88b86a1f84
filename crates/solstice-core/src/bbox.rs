//! Bounding box geometry primitives.
//!
//! All coordinates are in page-raster pixel space with the origin at the
//! top-left corner and y increasing downward. Boxes are validated on
//! construction; every operation on a valid box is total.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolsticeError};

/// Rectangular region `(x1, y1, x2, y2)` in page-raster pixel coordinates.
///
/// Serialized as a 4-element array to match the on-disk `content.json`
/// schema.
///
/// # Examples
///
/// ```
/// use solstice_core::BoundingBox;
///
/// let bbox = BoundingBox::new(100.0, 100.0, 300.0, 200.0).unwrap();
/// assert_eq!(bbox.area(), 200.0 * 100.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    /// Left x-coordinate
    pub x1: f32,
    /// Top y-coordinate
    pub y1: f32,
    /// Right x-coordinate
    pub x2: f32,
    /// Bottom y-coordinate
    pub y2: f32,
}

impl From<[f32; 4]> for BoundingBox {
    #[inline]
    fn from(v: [f32; 4]) -> Self {
        Self {
            x1: v[0],
            y1: v[1],
            x2: v[2],
            y2: v[3],
        }
    }
}

impl From<BoundingBox> for [f32; 4] {
    #[inline]
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl BoundingBox {
    /// Create a bounding box, validating the `x1 < x2 && y1 < y2` invariant.
    ///
    /// # Errors
    ///
    /// Returns [`SolsticeError::InvalidBBox`] for degenerate or inverted
    /// rectangles.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self> {
        if x1 < x2 && y1 < y2 {
            Ok(Self { x1, y1, x2, y2 })
        } else {
            Err(SolsticeError::InvalidBBox { x1, y1, x2, y2 })
        }
    }

    /// Box width in pixels.
    #[inline]
    #[must_use = "returns the width of the bounding box"]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Box height in pixels.
    #[inline]
    #[must_use = "returns the height of the bounding box"]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Box area in square pixels.
    #[inline]
    #[must_use = "returns the area of the bounding box"]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Horizontal and vertical center point.
    #[inline]
    #[must_use = "returns the center point of the bounding box"]
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Intersection area with another box (0.0 when disjoint).
    #[inline]
    #[must_use = "returns the intersection area with another bounding box"]
    pub fn intersection_area(&self, other: &Self) -> f32 {
        let x_overlap = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let y_overlap = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        x_overlap * y_overlap
    }

    /// Intersection-over-union ratio.
    #[inline]
    #[must_use = "returns the IoU ratio with another bounding box"]
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Intersection over the smaller of the two box areas.
    #[inline]
    #[must_use = "returns the intersection-over-smaller ratio"]
    pub fn intersection_over_smaller(&self, other: &Self) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / smaller
    }

    /// Overlap fraction from this box's perspective.
    #[inline]
    #[must_use = "returns the overlap fraction relative to this box's area"]
    pub fn intersection_over_self(&self, other: &Self) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / area
    }

    /// Smallest box containing both inputs.
    #[inline]
    #[must_use = "returns the union bounding box"]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Check whether the horizontal ranges `[x1, x2]` overlap.
    #[inline]
    #[must_use = "returns whether boxes overlap horizontally"]
    pub fn overlaps_horizontally(&self, other: &Self) -> bool {
        !(self.x2 <= other.x1 || other.x2 <= self.x1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_degenerate() {
        assert!(BoundingBox::new(10.0, 10.0, 10.0, 20.0).is_err());
        assert!(BoundingBox::new(10.0, 20.0, 20.0, 20.0).is_err());
        assert!(BoundingBox::new(30.0, 10.0, 20.0, 20.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_iou_identical_boxes() {
        let b = BoundingBox::new(0.0, 0.0, 100.0, 100.0).unwrap();
        assert!((b.iou(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0).unwrap();
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.intersection_area(&b), 0.0);
    }

    #[test]
    fn test_intersection_over_smaller() {
        // Small box fully inside a large box: IoS == 1.0
        let large = BoundingBox::new(0.0, 0.0, 100.0, 100.0).unwrap();
        let small = BoundingBox::new(10.0, 10.0, 20.0, 20.0).unwrap();
        assert!((large.intersection_over_smaller(&small) - 1.0).abs() < 1e-6);
        assert!((small.intersection_over_self(&large) - 1.0).abs() < 1e-6);
        assert!(large.intersection_over_self(&small) < 0.02);
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::new(100.0, 100.0, 300.0, 200.0).unwrap();
        let b = BoundingBox::new(110.0, 105.0, 305.0, 205.0).unwrap();
        let u = a.union(&b);
        assert_eq!((u.x1, u.y1, u.x2, u.y2), (100.0, 100.0, 305.0, 205.0));
    }

    #[test]
    fn test_serde_as_array() {
        let b = BoundingBox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
