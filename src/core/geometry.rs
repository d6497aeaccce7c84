//! Eye aspect ratio from eye contour geometry.
//!
//! `EAR = (|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)`. An open eye sits
//! around 0.25-0.35; a closed eye approaches 0.

use crate::capture::types::{FaceLandmarks, Point};

/// Geometry errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// Corner points coincide (or the result is not a finite number)
    DegenerateGeometry,
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::DegenerateGeometry => {
                write!(f, "Degenerate eye geometry: horizontal corner distance is zero")
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// Compute the eye aspect ratio of one eye.
pub fn eye_aspect_ratio(points: &[Point; 6]) -> Result<f64, GeometryError> {
    let a = points[1].distance(&points[5]);
    let b = points[2].distance(&points[4]);
    let c = points[0].distance(&points[3]);

    if c == 0.0 || !c.is_finite() {
        return Err(GeometryError::DegenerateGeometry);
    }

    let ear = (a + b) / (2.0 * c);
    if ear.is_finite() {
        Ok(ear)
    } else {
        Err(GeometryError::DegenerateGeometry)
    }
}

/// Mean EAR of both eyes. Fails if either eye is degenerate.
pub fn mean_eye_aspect_ratio(face: &FaceLandmarks) -> Result<f64, GeometryError> {
    let left = eye_aspect_ratio(face.left_eye.points())?;
    let right = eye_aspect_ratio(face.right_eye.points())?;
    Ok((left + right) / 2.0)
}
