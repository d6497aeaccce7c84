//! Session summaries.
//!
//! A [`SummaryTracker`] accumulates per-frame outcomes while a session runs.
//! [`SessionSummary::from_records`] rebuilds the same view from an exported
//! JSONL file.

use crate::core::engine::{DropReason, OcularEvent, OcularState};
use crate::core::record::EventRecord;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Aggregate view of one monitoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub operator_name: String,
    pub frames_processed: u64,
    pub frames_dropped_no_face: u64,
    pub frames_dropped_degenerate: u64,
    /// Processed frames per reported state
    pub state_counts: BTreeMap<OcularState, u64>,
    pub total_blinks: u64,
    pub alarms_raised: u64,
    /// Time between the first and last frame seen
    pub duration_secs: f64,
    /// `None` when the session is too short to measure
    pub blink_rate_per_min: Option<f64>,
    pub ear_mean: Option<f64>,
    /// Sample standard deviation; needs at least two frames
    pub ear_std_dev: Option<f64>,
}

impl SessionSummary {
    /// Summarize exported records. Skipped frames are not exported, so the
    /// drop counters are zero.
    pub fn from_records(records: &[EventRecord]) -> Self {
        let mut state_counts = BTreeMap::new();
        let mut ears = Vec::with_capacity(records.len());
        let mut total_blinks = 0;
        let mut alarms_raised = 0;

        for record in records {
            *state_counts.entry(record.state).or_insert(0) += 1;
            ears.push(record.eye_aspect_ratio);
            match record.event {
                Some(OcularEvent::BlinkCompleted { total }) => {
                    total_blinks = total_blinks.max(total);
                }
                Some(OcularEvent::AlarmRaised) => alarms_raised += 1,
                None => {}
            }
        }

        let duration_secs = match (records.first(), records.last()) {
            (Some(first), Some(last)) => {
                let millis = (last.timestamp - first.timestamp).num_milliseconds().max(0);
                millis as f64 / 1000.0
            }
            _ => 0.0,
        };

        let (session_id, operator_name) = records
            .first()
            .map(|r| (r.session_id.clone(), r.operator_name.clone()))
            .unwrap_or_default();

        Self {
            session_id,
            operator_name,
            frames_processed: records.len() as u64,
            frames_dropped_no_face: 0,
            frames_dropped_degenerate: 0,
            state_counts,
            total_blinks,
            alarms_raised,
            duration_secs,
            blink_rate_per_min: blink_rate(total_blinks, duration_secs),
            ear_mean: mean(&ears),
            ear_std_dev: std_dev(&ears),
        }
    }

    /// Share of processed frames reported as `state`, in `[0, 1]`.
    pub fn state_share(&self, state: OcularState) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        let count = self.state_counts.get(&state).copied().unwrap_or(0);
        count as f64 / self.frames_processed as f64
    }
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Session {}", self.session_id)?;
        if !self.operator_name.is_empty() {
            writeln!(f, "  Operator:            {}", self.operator_name)?;
        }
        writeln!(f, "  Duration:            {:.1}s", self.duration_secs)?;
        writeln!(f, "  Frames processed:    {}", self.frames_processed)?;
        writeln!(
            f,
            "  Frames skipped:      {} (no face: {}, unusable geometry: {})",
            self.frames_dropped_no_face + self.frames_dropped_degenerate,
            self.frames_dropped_no_face,
            self.frames_dropped_degenerate
        )?;
        writeln!(f, "  Blinks:              {}", self.total_blinks)?;
        if let Some(rate) = self.blink_rate_per_min {
            writeln!(f, "  Blink rate:          {rate:.1}/min")?;
        }
        writeln!(f, "  Closure alarms:      {}", self.alarms_raised)?;
        match (self.ear_mean, self.ear_std_dev) {
            (Some(mean), Some(sd)) => writeln!(f, "  EAR:                 {mean:.3} ± {sd:.3}")?,
            (Some(mean), None) => writeln!(f, "  EAR:                 {mean:.3}")?,
            _ => {}
        }
        writeln!(f, "  States:")?;
        for state in OcularState::ALL {
            writeln!(
                f,
                "    {:<9} {:>6} ({:.1}%)",
                state.label(),
                self.state_counts.get(&state).copied().unwrap_or(0),
                self.state_share(state) * 100.0
            )?;
        }
        Ok(())
    }
}

/// Accumulates outcomes while a session runs.
#[derive(Debug, Clone, Default)]
pub struct SummaryTracker {
    state_counts: BTreeMap<OcularState, u64>,
    ears: Vec<f64>,
    frames_dropped_no_face: u64,
    frames_dropped_degenerate: u64,
    total_blinks: u64,
    alarms_raised: u64,
    first_seen: Option<Instant>,
    last_seen: Option<Instant>,
}

impl SummaryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame that advanced the engine.
    pub fn record_processed(
        &mut self,
        state: OcularState,
        event: Option<OcularEvent>,
        eye_aspect_ratio: f64,
        at: Instant,
    ) {
        *self.state_counts.entry(state).or_insert(0) += 1;
        self.ears.push(eye_aspect_ratio);
        match event {
            Some(OcularEvent::BlinkCompleted { total }) => self.total_blinks = total,
            Some(OcularEvent::AlarmRaised) => self.alarms_raised += 1,
            None => {}
        }
        self.observe(at);
    }

    /// Record a skipped frame.
    pub fn record_dropped(&mut self, reason: DropReason, at: Instant) {
        match reason {
            DropReason::NoFaceDetected => self.frames_dropped_no_face += 1,
            DropReason::DegenerateGeometry => self.frames_dropped_degenerate += 1,
        }
        self.observe(at);
    }

    fn observe(&mut self, at: Instant) {
        self.first_seen.get_or_insert(at);
        self.last_seen = Some(at);
    }

    pub fn frames_processed(&self) -> u64 {
        self.ears.len() as u64
    }

    pub fn elapsed(&self) -> Duration {
        match (self.first_seen, self.last_seen) {
            (Some(first), Some(last)) => last.saturating_duration_since(first),
            _ => Duration::ZERO,
        }
    }

    /// Build the summary for the given session.
    pub fn summarize(
        &self,
        session_id: impl Into<String>,
        operator_name: impl Into<String>,
    ) -> SessionSummary {
        let duration_secs = self.elapsed().as_secs_f64();
        SessionSummary {
            session_id: session_id.into(),
            operator_name: operator_name.into(),
            frames_processed: self.frames_processed(),
            frames_dropped_no_face: self.frames_dropped_no_face,
            frames_dropped_degenerate: self.frames_dropped_degenerate,
            state_counts: self.state_counts.clone(),
            total_blinks: self.total_blinks,
            alarms_raised: self.alarms_raised,
            duration_secs,
            blink_rate_per_min: blink_rate(self.total_blinks, duration_secs),
            ear_mean: mean(&self.ears),
            ear_std_dev: std_dev(&self.ears),
        }
    }
}

fn blink_rate(blinks: u64, duration_secs: f64) -> Option<f64> {
    (duration_secs > 0.0).then(|| blinks as f64 * 60.0 / duration_secs)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.mean()).filter(|m| m.is_finite())
}

fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.std_dev()).filter(|sd| sd.is_finite())
}
