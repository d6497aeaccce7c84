//! Monitoring log.
//!
//! Counts what the agent has done across sessions: frames measured, frames
//! skipped, blinks, alarms and sink failures. No landmarks, images or
//! per-frame measurements are kept here.

use crate::core::DropReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cumulative monitoring counters.
#[derive(Debug)]
pub struct MonitoringLog {
    /// Frames that advanced the engine
    frames_processed: AtomicU64,
    /// Frames skipped because no face was detected
    frames_without_face: AtomicU64,
    /// Frames skipped because the eye geometry was unusable
    frames_degenerate: AtomicU64,
    /// Debounced blinks
    blinks_completed: AtomicU64,
    /// Prolonged-closure alarms
    alarms_raised: AtomicU64,
    /// Records a sink refused
    sink_failures: AtomicU64,
    /// Monitoring sessions started
    sessions_started: AtomicU64,
    /// Log start time
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl MonitoringLog {
    pub fn new() -> Self {
        Self {
            frames_processed: AtomicU64::new(0),
            frames_without_face: AtomicU64::new(0),
            frames_degenerate: AtomicU64::new(0),
            blinks_completed: AtomicU64::new(0),
            alarms_raised: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that persists to `path`, resuming any saved counters.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous monitoring stats: {}", e);
        }

        log
    }

    pub fn record_frame_processed(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a skipped frame under its reason.
    pub fn record_dropped(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::NoFaceDetected => &self.frames_without_face,
            DropReason::DegenerateGeometry => &self.frames_degenerate,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blink(&self) {
        self.blinks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alarm(&self) {
        self.alarms_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> MonitoringStats {
        MonitoringStats {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_without_face: self.frames_without_face.load(Ordering::Relaxed),
            frames_degenerate: self.frames_degenerate.load(Ordering::Relaxed),
            blinks_completed: self.blinks_completed.load(Ordering::Relaxed),
            alarms_raised: self.alarms_raised.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Monitoring Statistics:\n\
             - Sessions started: {}\n\
             - Frames processed: {}\n\
             - Frames without a face: {}\n\
             - Frames with unusable eye geometry: {}\n\
             - Blinks counted: {}\n\
             - Prolonged-closure alarms: {}\n\
             - Records refused by sinks: {}\n\
             \n\
             Data Retention:\n\
             - No camera images stored\n\
             - No landmark coordinates stored\n\
             - Only per-frame state and eye aspect ratio exported",
            stats.sessions_started,
            stats.frames_processed,
            stats.frames_without_face,
            stats.frames_degenerate,
            stats.blinks_completed,
            stats.alarms_raised,
            stats.sink_failures,
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                frames_processed: stats.frames_processed,
                frames_without_face: stats.frames_without_face,
                frames_degenerate: stats.frames_degenerate,
                blinks_completed: stats.blinks_completed,
                alarms_raised: stats.alarms_raised,
                sink_failures: stats.sink_failures,
                sessions_started: stats.sessions_started,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.frames_processed
                    .store(persisted.frames_processed, Ordering::Relaxed);
                self.frames_without_face
                    .store(persisted.frames_without_face, Ordering::Relaxed);
                self.frames_degenerate
                    .store(persisted.frames_degenerate, Ordering::Relaxed);
                self.blinks_completed
                    .store(persisted.blinks_completed, Ordering::Relaxed);
                self.alarms_raised
                    .store(persisted.alarms_raised, Ordering::Relaxed);
                self.sink_failures
                    .store(persisted.sink_failures, Ordering::Relaxed);
                self.sessions_started
                    .store(persisted.sessions_started, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for MonitoringLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of monitoring statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringStats {
    pub frames_processed: u64,
    pub frames_without_face: u64,
    pub frames_degenerate: u64,
    pub blinks_completed: u64,
    pub alarms_raised: u64,
    pub sink_failures: u64,
    pub sessions_started: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    frames_processed: u64,
    frames_without_face: u64,
    frames_degenerate: u64,
    blinks_completed: u64,
    alarms_raised: u64,
    sink_failures: u64,
    sessions_started: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared monitoring log.
pub type SharedMonitoringLog = Arc<MonitoringLog>;

pub fn create_shared_log() -> SharedMonitoringLog {
    Arc::new(MonitoringLog::new())
}

/// Create a shared log that persists to `path`.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedMonitoringLog {
    Arc::new(MonitoringLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_dropped_frames_by_reason() {
        let log = MonitoringLog::new();

        log.record_frame_processed();
        log.record_dropped(DropReason::NoFaceDetected);
        log.record_dropped(DropReason::NoFaceDetected);
        log.record_dropped(DropReason::DegenerateGeometry);

        let stats = log.stats();
        assert_eq!(stats.frames_processed, 1);
        assert_eq!(stats.frames_without_face, 2);
        assert_eq!(stats.frames_degenerate, 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitoring_stats.json");

        let log = MonitoringLog::with_persistence(path.clone());
        log.record_session_started();
        log.record_blink();
        log.record_blink();
        log.save().unwrap();

        let resumed = MonitoringLog::with_persistence(path);
        let stats = resumed.stats();
        assert_eq!(stats.sessions_started, 1);
        assert_eq!(stats.blinks_completed, 2);
    }

    #[test]
    fn test_summary_format() {
        let summary = MonitoringLog::new().summary();

        assert!(summary.contains("Frames processed"));
        assert!(summary.contains("Prolonged-closure alarms"));
        assert!(summary.contains("No camera images stored"));
    }
}
