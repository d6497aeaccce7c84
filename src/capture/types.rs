//! Geometric and pixel types delivered by the external detectors.
//!
//! These types carry ONLY what the classification core needs: eye contour
//! geometry and small cropped eye-region intensity grids. Full frames are
//! never stored.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A 2-D point in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Integer crop rectangle around a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Six ordered contour points for one eye.
///
/// Layout: `p0`/`p3` are the horizontal corners, `p1`/`p2` the upper lid,
/// `p4`/`p5` the lower lid (so `p1` faces `p5` and `p2` faces `p4`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EyeLandmarks {
    points: [Point; 6],
}

impl EyeLandmarks {
    pub fn new(points: [Point; 6]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point; 6] {
        &self.points
    }

    /// Smallest integer rectangle enclosing all six points.
    ///
    /// Coordinates are clamped to `[0, u32::MAX]`. Returns `None` when any
    /// point is not finite.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        if self.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return None;
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let clamp = |v: f64| v.floor().clamp(0.0, u32::MAX as f64) as u32;
        let (x0, y0) = (clamp(min_x), clamp(min_y));
        let (x1, y1) = (clamp(max_x), clamp(max_y));

        Some(BoundingBox {
            x: x0,
            y: y0,
            width: (x1 - x0).saturating_add(1),
            height: (y1 - y0).saturating_add(1),
        })
    }
}

/// Both eye contours for one detected face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_eye: EyeLandmarks,
    pub right_eye: EyeLandmarks,
}

/// Row-major 8-bit single-channel pixel grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntensityGrid {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl IntensityGrid {
    /// Wrap a pixel buffer. The buffer is not validated here; see
    /// [`IntensityGrid::is_well_formed`].
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Build a grid by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Whether the buffer length matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.width.checked_mul(self.height) == Some(self.pixels.len())
    }

    /// Iterate over rows. Empty for malformed grids.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let width = if self.is_well_formed() { self.width } else { 0 };
        self.pixels
            .chunks(width.max(1))
            .take(if width == 0 { 0 } else { self.height })
    }

    /// Copy out the region covered by `bbox`, clipped to the grid.
    ///
    /// Returns `None` when the grid is malformed or the clipped region is empty.
    pub fn crop(&self, bbox: &BoundingBox) -> Option<IntensityGrid> {
        if !self.is_well_formed() {
            return None;
        }
        let x0 = (bbox.x as usize).min(self.width);
        let y0 = (bbox.y as usize).min(self.height);
        let x1 = (bbox.x as usize)
            .saturating_add(bbox.width as usize)
            .min(self.width);
        let y1 = (bbox.y as usize)
            .saturating_add(bbox.height as usize)
            .min(self.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let mut pixels = Vec::with_capacity((x1 - x0) * (y1 - y0));
        for row in self.rows().skip(y0).take(y1 - y0) {
            pixels.extend_from_slice(&row[x0..x1]);
        }
        Some(IntensityGrid::new(x1 - x0, y1 - y0, pixels))
    }
}

/// One detected face as delivered by the providers for a single cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    #[serde(flatten)]
    pub landmarks: FaceLandmarks,
    /// Cropped intensity grid of the left eye (if the region source had one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_region: Option<IntensityGrid>,
    /// Cropped intensity grid of the right eye
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_region: Option<IntensityGrid>,
}

impl FaceObservation {
    /// An observation with landmarks only.
    pub fn landmarks_only(landmarks: FaceLandmarks) -> Self {
        Self {
            landmarks,
            left_region: None,
            right_region: None,
        }
    }
}

/// A single acquisition cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// Monotonic offset from the start of the stream
    pub offset: Duration,
    /// The detected face, or `None` when no face was found this cycle
    pub face: Option<FaceObservation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eye() -> EyeLandmarks {
        EyeLandmarks::new([
            Point::new(10.2, 20.0),
            Point::new(12.0, 18.5),
            Point::new(14.0, 18.5),
            Point::new(16.7, 20.0),
            Point::new(14.0, 21.9),
            Point::new(12.0, 21.9),
        ])
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_serializes_as_pair() {
        let json = serde_json::to_string(&Point::new(1.5, 2.0)).unwrap();
        assert_eq!(json, "[1.5,2.0]");
        let back: Point = serde_json::from_str("[3,4]").unwrap();
        assert_eq!(back, Point::new(3.0, 4.0));
    }

    #[test]
    fn test_bounding_box() {
        let bbox = eye().bounding_box().unwrap();
        assert_eq!(bbox.x, 10);
        assert_eq!(bbox.y, 18);
        assert_eq!(bbox.width, 7);
        assert_eq!(bbox.height, 4);
    }

    #[test]
    fn test_bounding_box_rejects_non_finite_points() {
        let mut points = *eye().points();
        points[3] = Point::new(f64::INFINITY, 0.0);
        assert_eq!(EyeLandmarks::new(points).bounding_box(), None);

        points[3] = Point::new(16.7, f64::NAN);
        assert_eq!(EyeLandmarks::new(points).bounding_box(), None);
    }

    #[test]
    fn test_bounding_box_clamps_huge_coordinates() {
        let mut points = *eye().points();
        points[3] = Point::new(1e12, 20.0);
        let bbox = EyeLandmarks::new(points).bounding_box().unwrap();
        assert_eq!(bbox.x, 10);
        assert_eq!(bbox.width, u32::MAX - 10 + 1);

        points[0] = Point::new(-5.0, 20.0);
        points[3] = Point::new(f64::MAX, 20.0);
        let bbox = EyeLandmarks::new(points).bounding_box().unwrap();
        assert_eq!(bbox.x, 0);
        assert_eq!(bbox.width, u32::MAX);
    }

    #[test]
    fn test_grid_crop() {
        let grid = IntensityGrid::from_fn(8, 4, |x, y| (y * 8 + x) as u8);
        let bbox = BoundingBox {
            x: 2,
            y: 1,
            width: 3,
            height: 2,
        };
        let crop = grid.crop(&bbox).unwrap();
        assert_eq!(crop.width(), 3);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.pixels(), &[10, 11, 12, 18, 19, 20]);
    }

    #[test]
    fn test_crop_clipped_and_malformed() {
        let grid = IntensityGrid::from_fn(4, 4, |_, _| 0);
        let outside = BoundingBox {
            x: 10,
            y: 10,
            width: 2,
            height: 2,
        };
        assert!(grid.crop(&outside).is_none());

        let malformed = IntensityGrid::new(4, 4, vec![0; 3]);
        assert!(!malformed.is_well_formed());
        assert_eq!(malformed.rows().count(), 0);
    }
}
