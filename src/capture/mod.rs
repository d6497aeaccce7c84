//! Frame acquisition for the Ocular Sensor Agent.
//!
//! Face and landmark detection live outside this crate. Detectors plug in
//! through the [`LandmarkProvider`] and [`GazeRegionProvider`] capability
//! traits; recorded streams are replayed through [`ReplaySource`]. Either way
//! frames reach the classification loop through a [`FrameCollector`] running
//! on its own thread.

pub mod collector;
pub mod replay;
pub mod types;

use std::time::Instant;

// Re-export commonly used types
pub use collector::{CaptureResult, CollectorConfig, FrameCollector};
pub use replay::{write_replay, ReplayFrame, ReplaySource};
pub use types::{
    BoundingBox, CapturedFrame, EyeLandmarks, FaceLandmarks, FaceObservation, IntensityGrid, Point,
};

/// Errors raised by frame sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The upstream camera or detector is gone; the session ends cleanly
    SourceLost(String),
    /// Reading a recorded stream failed
    Io(String),
    /// A recorded stream line could not be decoded
    Parse { line: usize, message: String },
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::SourceLost(e) => write!(f, "Frame source lost: {e}"),
            CaptureError::Io(e) => write!(f, "IO error: {e}"),
            CaptureError::Parse { line, message } => {
                write!(f, "Parse error on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// Supplies eye landmarks for the next frame.
pub trait LandmarkProvider {
    /// `Ok(None)` means no face was detected this cycle.
    fn next_landmarks(&mut self) -> Result<Option<FaceLandmarks>, CaptureError>;
}

/// Supplies cropped eye-region intensity grids for detected landmarks.
pub trait GazeRegionProvider {
    /// Returns `(left, right)` regions; either may be unavailable.
    fn eye_regions(
        &mut self,
        landmarks: &FaceLandmarks,
    ) -> (Option<IntensityGrid>, Option<IntensityGrid>);
}

/// A sequential source of captured frames.
pub trait FrameSource {
    /// `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError>;
}

/// Combines a landmark provider and a region provider into a frame source.
///
/// Frame offsets come from a monotonic clock started when the pipeline is
/// created. A live pipeline only ends when the landmark provider reports an
/// error.
pub struct CapturePipeline<L, G> {
    landmarks: L,
    regions: G,
    origin: Instant,
}

impl<L: LandmarkProvider, G: GazeRegionProvider> CapturePipeline<L, G> {
    pub fn new(landmarks: L, regions: G) -> Self {
        Self {
            landmarks,
            regions,
            origin: Instant::now(),
        }
    }

    /// Acquire one observation without stamping it.
    pub fn observe(&mut self) -> Result<Option<FaceObservation>, CaptureError> {
        let observation = self.landmarks.next_landmarks()?.map(|landmarks| {
            let (left_region, right_region) = self.regions.eye_regions(&landmarks);
            FaceObservation {
                landmarks,
                left_region,
                right_region,
            }
        });
        Ok(observation)
    }
}

impl<L: LandmarkProvider, G: GazeRegionProvider> FrameSource for CapturePipeline<L, G> {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        let face = self.observe()?;
        Ok(Some(CapturedFrame {
            offset: self.origin.elapsed(),
            face,
        }))
    }
}

/// Region provider that crops eye regions out of a fixed grayscale frame.
///
/// Useful when the detector hands over one full frame per cycle; swap the
/// frame with [`FrameCropper::set_frame`] before each `eye_regions` call.
#[derive(Debug, Default)]
pub struct FrameCropper {
    frame: Option<IntensityGrid>,
}

impl FrameCropper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_frame(&mut self, frame: IntensityGrid) {
        self.frame = Some(frame);
    }
}

impl GazeRegionProvider for FrameCropper {
    fn eye_regions(
        &mut self,
        landmarks: &FaceLandmarks,
    ) -> (Option<IntensityGrid>, Option<IntensityGrid>) {
        match self.frame {
            Some(ref frame) => {
                let crop = |eye: &EyeLandmarks| eye.bounding_box().and_then(|b| frame.crop(&b));
                (crop(&landmarks.left_eye), crop(&landmarks.right_eye))
            }
            None => (None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedLandmarks(VecDeque<Result<Option<FaceLandmarks>, CaptureError>>);

    impl LandmarkProvider for ScriptedLandmarks {
        fn next_landmarks(&mut self) -> Result<Option<FaceLandmarks>, CaptureError> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(CaptureError::SourceLost("script exhausted".into())))
        }
    }

    fn face() -> FaceLandmarks {
        let eye = EyeLandmarks::new([
            Point::new(1.0, 2.0),
            Point::new(2.0, 1.0),
            Point::new(3.0, 1.0),
            Point::new(4.0, 2.0),
            Point::new(3.0, 3.0),
            Point::new(2.0, 3.0),
        ]);
        FaceLandmarks {
            left_eye: eye,
            right_eye: eye,
        }
    }

    #[test]
    fn test_pipeline_frames() {
        let script = ScriptedLandmarks(VecDeque::from(vec![Ok(Some(face())), Ok(None)]));
        let mut cropper = FrameCropper::new();
        cropper.set_frame(IntensityGrid::from_fn(8, 8, |_, _| 200));
        let mut pipeline = CapturePipeline::new(script, cropper);

        let first = pipeline.next_frame().unwrap().unwrap();
        let observation = first.face.unwrap();
        let left = observation.left_region.unwrap();
        assert_eq!((left.width(), left.height()), (4, 3));

        let second = pipeline.next_frame().unwrap().unwrap();
        assert!(second.face.is_none());
        assert!(second.offset >= first.offset);

        assert!(matches!(
            pipeline.next_frame(),
            Err(CaptureError::SourceLost(_))
        ));
    }

    #[test]
    fn test_non_finite_landmark_leaves_region_empty() {
        let mut broken = face();
        let mut points = *broken.left_eye.points();
        points[3] = Point::new(f64::INFINITY, 0.0);
        broken.left_eye = EyeLandmarks::new(points);

        let script = ScriptedLandmarks(VecDeque::from(vec![Ok(Some(broken))]));
        let mut cropper = FrameCropper::new();
        cropper.set_frame(IntensityGrid::from_fn(8, 8, |_, _| 200));
        let mut pipeline = CapturePipeline::new(script, cropper);

        let observation = pipeline.next_frame().unwrap().unwrap().face.unwrap();
        assert!(observation.left_region.is_none());
        assert!(observation.right_region.is_some());
    }

    #[test]
    fn test_cropper_without_frame() {
        let mut cropper = FrameCropper::new();
        let (left, right) = cropper.eye_regions(&face());
        assert!(left.is_none());
        assert!(right.is_none());
    }
}
