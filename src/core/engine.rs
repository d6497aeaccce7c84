//! Temporal state engine.
//!
//! Turns per-frame EAR and gaze readings into a debounced operator state:
//!
//! 1. **Blink debounce**: a closed run counts as one blink when the eye
//!    reopens, provided the run lasted at least `min_consec_frames`.
//! 2. **Prolonged-closure alarm**: edge-triggered once per closure episode
//!    when the run has lasted `alarm_duration` of monotonic time. Cleared
//!    silently on reopening.
//! 3. **State selection**: a closed eye reports `Blinking`; otherwise the
//!    combined gaze direction.
//!
//! Frames without a usable measurement leave the state untouched and repeat
//! the previously reported state.

use crate::config::EngineConfig;
use crate::core::gaze::{combine_gaze, GazeDirection};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Externally reported operator state.
///
/// Serialized with the labels used in persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OcularState {
    #[serde(rename = "Blinking")]
    Blinking,
    #[serde(rename = "LEFT")]
    GazeLeft,
    #[serde(rename = "RIGHT")]
    GazeRight,
    #[serde(rename = "CENTER")]
    GazeCenter,
}

impl OcularState {
    pub const ALL: [OcularState; 4] = [
        OcularState::Blinking,
        OcularState::GazeLeft,
        OcularState::GazeRight,
        OcularState::GazeCenter,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Blinking => "Blinking",
            Self::GazeLeft => "LEFT",
            Self::GazeRight => "RIGHT",
            Self::GazeCenter => "CENTER",
        }
    }
}

impl From<GazeDirection> for OcularState {
    fn from(direction: GazeDirection) -> Self {
        match direction {
            GazeDirection::Left => OcularState::GazeLeft,
            GazeDirection::Right => OcularState::GazeRight,
            GazeDirection::Center => OcularState::GazeCenter,
        }
    }
}

impl std::fmt::Display for OcularState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Discrete events emitted on state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OcularEvent {
    /// A debounced blink finished; `total` is the running session count
    BlinkCompleted { total: u64 },
    /// The eyes have stayed closed for the alarm duration
    AlarmRaised,
}

/// Measurements for one processed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFeatures {
    /// Mean EAR of both eyes
    pub eye_aspect_ratio: f64,
    pub left_gaze: GazeDirection,
    pub right_gaze: GazeDirection,
    /// Monotonic capture time
    pub timestamp: Instant,
}

/// Why a frame produced no measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    DegenerateGeometry,
    NoFaceDetected,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::DegenerateGeometry => write!(f, "degenerate geometry"),
            DropReason::NoFaceDetected => write!(f, "no face detected"),
        }
    }
}

/// Input to one engine step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameInput {
    Features(FrameFeatures),
    Dropped(DropReason),
}

/// Result of one engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The frame advanced the state machine
    Processed {
        state: OcularState,
        event: Option<OcularEvent>,
    },
    /// The frame was skipped; `state` repeats the last reported state
    Held {
        state: Option<OcularState>,
        reason: DropReason,
    },
}

impl StepOutcome {
    pub fn state(&self) -> Option<OcularState> {
        match *self {
            StepOutcome::Processed { state, .. } => Some(state),
            StepOutcome::Held { state, .. } => state,
        }
    }

    pub fn event(&self) -> Option<OcularEvent> {
        match *self {
            StepOutcome::Processed { event, .. } => event,
            StepOutcome::Held { .. } => None,
        }
    }
}

/// Per-session engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState {
    /// Length of the current closed run in frames
    pub consecutive_low_ear_frames: u32,
    /// Debounced blinks since session start
    pub total_blink_count: u64,
    /// Start of the current closure episode
    pub closure_start: Option<Instant>,
    /// Whether the current closure episode has raised the alarm
    pub alarm_active: bool,
    /// Last reported state, repeated on dropped frames
    pub last_state: Option<OcularState>,
}

/// Advance the state machine by one frame.
pub fn advance(
    config: &EngineConfig,
    mut state: EngineState,
    input: FrameInput,
) -> (EngineState, StepOutcome) {
    let features = match input {
        FrameInput::Features(f) if f.eye_aspect_ratio.is_finite() => f,
        FrameInput::Features(_) => return hold(state, DropReason::DegenerateGeometry),
        FrameInput::Dropped(reason) => return hold(state, reason),
    };

    let closed = features.eye_aspect_ratio < config.ear_threshold;
    let mut event = None;

    // Blink debounce
    if closed {
        state.consecutive_low_ear_frames = state.consecutive_low_ear_frames.saturating_add(1);
    } else {
        if state.consecutive_low_ear_frames >= config.min_consec_frames {
            state.total_blink_count += 1;
            event = Some(OcularEvent::BlinkCompleted {
                total: state.total_blink_count,
            });
        }
        state.consecutive_low_ear_frames = 0;
    }

    // Prolonged-closure alarm
    if closed {
        match state.closure_start {
            None => state.closure_start = Some(features.timestamp),
            Some(start) => {
                let elapsed = features.timestamp.saturating_duration_since(start);
                if elapsed >= config.alarm_duration && !state.alarm_active {
                    state.alarm_active = true;
                    event = Some(OcularEvent::AlarmRaised);
                }
            }
        }
    } else {
        state.closure_start = None;
        state.alarm_active = false;
    }

    // State selection
    let reported = if closed {
        OcularState::Blinking
    } else {
        combine_gaze(features.left_gaze, features.right_gaze).into()
    };
    state.last_state = Some(reported);

    (
        state,
        StepOutcome::Processed {
            state: reported,
            event,
        },
    )
}

fn hold(state: EngineState, reason: DropReason) -> (EngineState, StepOutcome) {
    let held = state.last_state;
    (
        state,
        StepOutcome::Held {
            state: held,
            reason,
        },
    )
}

/// Owns one session's engine state.
///
/// `process_frame` takes `&mut self`, so a session processes exactly one
/// frame at a time. Independent sessions each own their own engine.
#[derive(Debug, Clone)]
pub struct TemporalStateEngine {
    config: EngineConfig,
    state: EngineState,
}

impl TemporalStateEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: EngineState::default(),
        }
    }

    /// Advance by one frame.
    pub fn process_frame(&mut self, input: FrameInput) -> StepOutcome {
        let (next, outcome) = advance(&self.config, std::mem::take(&mut self.state), input);
        self.state = next;
        outcome
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a fresh session.
    pub fn reset(&mut self) {
        self.state = EngineState::default();
    }

    /// End the session. Pending closure timing is discarded without raising
    /// an alarm; the returned state keeps the final counters.
    pub fn teardown(mut self) -> EngineState {
        self.state.closure_start = None;
        self.state.alarm_active = false;
        self.state.consecutive_low_ear_frames = 0;
        self.state
    }
}

impl Default for TemporalStateEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
