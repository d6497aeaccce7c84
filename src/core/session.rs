//! Monitoring sessions.
//!
//! A [`MonitoringSession`] owns one operator's engine and runs the per-frame
//! pipeline: extract features, advance the engine, build a record and hand it
//! to the sink. [`run_session`] drives a session from a frame collector.

use crate::capture::{CaptureError, CaptureResult, FaceObservation};
use crate::config::{Config, EngineConfig, GazeConfig};
use crate::core::engine::{
    DropReason, EngineState, FrameInput, OcularEvent, StepOutcome, TemporalStateEngine,
};
use crate::core::features::extract_features;
use crate::core::record::{EventRecord, RecordBuilder};
use crate::core::summary::{SessionSummary, SummaryTracker};
use crate::sink::{EventSink, SinkError};
use crate::transparency::SharedMonitoringLog;
use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Consecutive skipped frames that trigger a warning.
pub const DROP_BURST_WARN: u32 = 30;

/// How long [`run_session`] waits for a frame before re-checking the stop flag.
const RECV_POLL: Duration = Duration::from_millis(100);

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct SessionStep {
    pub outcome: StepOutcome,
    /// Record emitted for this frame; `None` for skipped frames
    pub record: Option<EventRecord>,
    /// Set when the sink refused the record
    pub sink_error: Option<SinkError>,
}

/// One operator's monitoring session.
pub struct MonitoringSession {
    engine: TemporalStateEngine,
    gaze: GazeConfig,
    records: RecordBuilder,
    sink: Arc<dyn EventSink>,
    log: Option<SharedMonitoringLog>,
    tracker: SummaryTracker,
    consecutive_drops: u32,
    /// Wall-clock time of the first frame, paired with its monotonic time
    clock_anchor: Option<(Instant, DateTime<Utc>)>,
}

impl MonitoringSession {
    /// Start a session with a fresh session id and engine.
    pub fn new(operator_name: impl Into<String>, config: &Config, sink: Arc<dyn EventSink>) -> Self {
        Self::with_parts(operator_name, config.engine.clone(), config.gaze.clone(), sink)
    }

    /// Start a session from explicit engine and gaze settings.
    pub fn with_parts(
        operator_name: impl Into<String>,
        engine: EngineConfig,
        gaze: GazeConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let records = RecordBuilder::new(operator_name);
        tracing::info!(
            session_id = records.session_id(),
            operator = records.operator_name(),
            "Monitoring session started"
        );

        Self {
            engine: TemporalStateEngine::new(engine),
            gaze,
            records,
            sink,
            log: None,
            tracker: SummaryTracker::new(),
            consecutive_drops: 0,
            clock_anchor: None,
        }
    }

    /// Count this session's activity in a shared monitoring log.
    pub fn with_log(mut self, log: SharedMonitoringLog) -> Self {
        log.record_session_started();
        self.log = Some(log);
        self
    }

    pub fn session_id(&self) -> &str {
        self.records.session_id()
    }

    pub fn operator_name(&self) -> &str {
        self.records.operator_name()
    }

    pub fn engine_state(&self) -> &EngineState {
        self.engine.state()
    }

    /// Process one acquisition cycle observed at `now`.
    pub fn process(&mut self, observation: Option<&FaceObservation>, now: Instant) -> SessionStep {
        let input = extract_features(observation, now, &self.gaze);
        self.process_input(input, now)
    }

    /// Wall-clock capture time of a frame observed at `now`, anchored on the
    /// session's first frame.
    fn capture_time(&mut self, now: Instant) -> DateTime<Utc> {
        let (anchor, wall) = *self.clock_anchor.get_or_insert_with(|| (now, Utc::now()));
        let offset = chrono::Duration::from_std(now.saturating_duration_since(anchor))
            .unwrap_or_else(|_| chrono::Duration::zero());
        wall + offset
    }

    /// Process already-extracted engine input.
    pub fn process_input(&mut self, input: FrameInput, now: Instant) -> SessionStep {
        let captured_at = self.capture_time(now);
        let ear = match input {
            FrameInput::Features(f) => Some(f.eye_aspect_ratio),
            FrameInput::Dropped(_) => None,
        };
        let outcome = self.engine.process_frame(input);

        match (outcome, ear) {
            (StepOutcome::Processed { state, event }, Some(ear)) => {
                self.consecutive_drops = 0;
                self.tracker.record_processed(state, event, ear, now);
                self.note_processed(event);

                let record = self.records.build(state, event, ear, captured_at);
                tracing::debug!(state = %state, ear, "Frame processed");

                let sink_error = self.sink.emit(&record).err();
                if let Some(ref e) = sink_error {
                    tracing::warn!("Failed to persist record: {}", e);
                    if let Some(log) = &self.log {
                        log.record_sink_failure();
                    }
                }

                SessionStep {
                    outcome,
                    record: Some(record),
                    sink_error,
                }
            }
            (StepOutcome::Held { reason, .. }, _) => {
                self.note_dropped(reason, now);
                SessionStep {
                    outcome,
                    record: None,
                    sink_error: None,
                }
            }
            (StepOutcome::Processed { .. }, None) => SessionStep {
                outcome,
                record: None,
                sink_error: None,
            },
        }
    }

    fn note_processed(&self, event: Option<OcularEvent>) {
        if let Some(log) = &self.log {
            log.record_frame_processed();
        }
        match event {
            Some(OcularEvent::BlinkCompleted { total }) => {
                tracing::debug!(total, "Blink completed");
                if let Some(log) = &self.log {
                    log.record_blink();
                }
            }
            Some(OcularEvent::AlarmRaised) => {
                tracing::warn!(
                    session_id = self.session_id(),
                    operator = self.operator_name(),
                    "Prolonged eye closure alarm raised"
                );
                if let Some(log) = &self.log {
                    log.record_alarm();
                }
            }
            None => {}
        }
    }

    fn note_dropped(&mut self, reason: DropReason, now: Instant) {
        self.tracker.record_dropped(reason, now);
        if let Some(log) = &self.log {
            log.record_dropped(reason);
        }

        self.consecutive_drops = self.consecutive_drops.saturating_add(1);
        if self.consecutive_drops == DROP_BURST_WARN {
            tracing::warn!(
                frames = self.consecutive_drops,
                "Frames skipped in a row ({})",
                reason
            );
        } else {
            tracing::debug!("Frame skipped: {}", reason);
        }
    }

    /// Summary of the session so far.
    pub fn summary(&self) -> SessionSummary {
        self.tracker
            .summarize(self.session_id(), self.operator_name())
    }

    /// End the session: flush the sink and discard pending closure timing.
    pub fn finish(self) -> SessionSummary {
        if let Err(e) = self.sink.flush() {
            tracing::warn!("Failed to flush sink: {}", e);
            if let Some(log) = &self.log {
                log.record_sink_failure();
            }
        }

        let summary = self.summary();
        let final_state = self.engine.teardown();
        tracing::info!(
            session_id = %summary.session_id,
            blinks = final_state.total_blink_count,
            frames = summary.frames_processed,
            "Monitoring session finished"
        );
        summary
    }
}

/// Why [`run_session`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The frame source reached its end
    StreamEnded,
    /// The stop flag was cleared
    Stopped,
    /// The frame source failed
    SourceLost(CaptureError),
}

/// Process frames from `frames` until the stream ends, the source fails or
/// `running` is cleared.
///
/// Frame offsets are measured from `origin`. `on_step` sees every step.
pub fn run_session(
    frames: &Receiver<CaptureResult>,
    session: &mut MonitoringSession,
    origin: Instant,
    running: &AtomicBool,
    mut on_step: impl FnMut(&SessionStep),
) -> SessionEnd {
    while running.load(Ordering::SeqCst) {
        match frames.recv_timeout(RECV_POLL) {
            Ok(Ok(frame)) => {
                let step = session.process(frame.face.as_ref(), origin + frame.offset);
                on_step(&step);
            }
            Ok(Err(e)) => {
                tracing::warn!("Ending session: {}", e);
                return SessionEnd::SourceLost(e);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return SessionEnd::StreamEnded,
        }
    }
    SessionEnd::Stopped
}
