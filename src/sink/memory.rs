//! In-memory sink.

use crate::core::EventRecord;
use crate::sink::{EventSink, SinkError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Keeps records in memory. Availability can be toggled to simulate an
/// unreachable store.
#[derive(Debug)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
    available: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// While unavailable, `emit` fails with [`SinkError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Copy of all records received so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("memory sink disabled".to_string()));
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OcularState;
    use crate::sink::tests::sample_record;

    #[test]
    fn test_memory_sink_collects_and_toggles() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.emit(&sample_record(OcularState::GazeLeft)).unwrap();
        sink.set_available(false);
        assert!(sink.emit(&sample_record(OcularState::GazeRight)).is_err());
        sink.set_available(true);
        sink.emit(&sample_record(OcularState::Blinking)).unwrap();

        let states: Vec<_> = sink.records().iter().map(|r| r.state).collect();
        assert_eq!(states, vec![OcularState::GazeLeft, OcularState::Blinking]);
    }
}
