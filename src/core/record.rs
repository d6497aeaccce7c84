//! Event records emitted to sinks after each processed frame.
//!
//! The document shape follows the shared `readings` store used by the other
//! operator sensors: `sensor_type`, `value`, `timestamp`, `operator_name`,
//! plus the session id and the discrete event (if any).

use crate::core::engine::{OcularEvent, OcularState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sensor type tag for records produced by this agent.
pub const SENSOR_TYPE: &str = "gaze";

/// One persisted reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monitoring session this reading belongs to
    pub session_id: String,
    /// Operator being monitored
    pub operator_name: String,
    /// Always [`SENSOR_TYPE`] for this agent
    pub sensor_type: String,
    /// Reported state for the frame
    #[serde(rename = "value")]
    pub state: OcularState,
    /// Discrete event raised on this frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<OcularEvent>,
    /// Mean EAR measured on this frame
    pub eye_aspect_ratio: f64,
    /// Wall-clock capture time of the frame
    pub timestamp: DateTime<Utc>,
}

/// Builds records for one monitoring session.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    session_id: String,
    operator_name: String,
}

impl RecordBuilder {
    /// Create a builder with a fresh session ID.
    pub fn new(operator_name: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            operator_name: operator_name.into(),
        }
    }

    /// Override the session ID.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn operator_name(&self) -> &str {
        &self.operator_name
    }

    /// Build the record for a processed frame.
    pub fn build(
        &self,
        state: OcularState,
        event: Option<OcularEvent>,
        eye_aspect_ratio: f64,
        timestamp: DateTime<Utc>,
    ) -> EventRecord {
        EventRecord {
            session_id: self.session_id.clone(),
            operator_name: self.operator_name.clone(),
            sensor_type: SENSOR_TYPE.to_string(),
            state,
            event,
            eye_aspect_ratio,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_session_ids_unique() {
        let a = RecordBuilder::new("op");
        let b = RecordBuilder::new("op");
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_record_document_shape() {
        let builder = RecordBuilder::new("Dana").with_session_id("SESS-1");
        let record = builder.build(OcularState::GazeRight, None, 0.31, Utc::now());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["sensor_type"], "gaze");
        assert_eq!(value["value"], "RIGHT");
        assert_eq!(value["operator_name"], "Dana");
        assert_eq!(value["session_id"], "SESS-1");
        assert!(value.get("event").is_none());
        assert!(value["timestamp"].as_str().is_some());
    }

    #[test]
    fn test_record_with_event_parses_back() {
        let builder = RecordBuilder::new("Dana");
        let record = builder.build(
            OcularState::Blinking,
            Some(OcularEvent::AlarmRaised),
            0.05,
            Utc::now(),
        );
        let json = serde_json::to_string(&record).unwrap();
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
