//! Core functionality for the Ocular Sensor Agent.
//!
//! This module contains:
//! - Eye aspect ratio geometry and the gaze classifier
//! - The temporal state engine (blink debounce, closure alarm, state selection)
//! - Per-frame feature extraction and record building
//! - Monitoring sessions and their summaries

pub mod engine;
pub mod features;
pub mod gaze;
pub mod geometry;
pub mod record;
pub mod session;
pub mod summary;

// Re-export commonly used types
pub use engine::{
    advance, DropReason, EngineState, FrameFeatures, FrameInput, OcularEvent, OcularState,
    StepOutcome, TemporalStateEngine,
};
pub use features::extract_features;
pub use gaze::{classify_gaze, combine_gaze, GazeDirection};
pub use geometry::{eye_aspect_ratio, mean_eye_aspect_ratio, GeometryError};
pub use record::{EventRecord, RecordBuilder, SENSOR_TYPE};
pub use session::{run_session, MonitoringSession, SessionEnd, SessionStep};
pub use summary::{SessionSummary, SummaryTracker};
