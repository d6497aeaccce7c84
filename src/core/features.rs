//! Per-frame feature extraction.
//!
//! Turns one face observation into the engine input for that frame. Only
//! derived scalars leave this module; landmark points and pixel grids are
//! dropped once the frame is measured.

use crate::capture::types::{FaceObservation, IntensityGrid};
use crate::config::GazeConfig;
use crate::core::engine::{DropReason, FrameFeatures, FrameInput};
use crate::core::gaze::{classify_gaze, GazeDirection};
use crate::core::geometry::mean_eye_aspect_ratio;
use std::time::Instant;

/// Extract the engine input for one acquisition cycle.
///
/// - no face → `Dropped(NoFaceDetected)`
/// - degenerate eye geometry → `Dropped(DegenerateGeometry)`
/// - a missing eye region reads as `Center` for that eye
pub fn extract_features(
    observation: Option<&FaceObservation>,
    timestamp: Instant,
    gaze: &GazeConfig,
) -> FrameInput {
    let observation = match observation {
        Some(obs) => obs,
        None => return FrameInput::Dropped(DropReason::NoFaceDetected),
    };

    let eye_aspect_ratio = match mean_eye_aspect_ratio(&observation.landmarks) {
        Ok(ear) => ear,
        Err(_) => return FrameInput::Dropped(DropReason::DegenerateGeometry),
    };

    FrameInput::Features(FrameFeatures {
        eye_aspect_ratio,
        left_gaze: region_gaze(observation.left_region.as_ref(), gaze),
        right_gaze: region_gaze(observation.right_region.as_ref(), gaze),
        timestamp,
    })
}

fn region_gaze(region: Option<&IntensityGrid>, config: &GazeConfig) -> GazeDirection {
    region
        .map(|r| classify_gaze(r, config))
        .unwrap_or(GazeDirection::Center)
}
