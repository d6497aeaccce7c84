//! Event sinks: where processed-frame records go.
//!
//! The classification loop emits one [`EventRecord`] per processed frame and
//! never depends on the sink succeeding. Sink failures are reported back to
//! the caller, logged and counted, and the loop carries on.

pub mod background;
pub mod jsonl;
pub mod memory;

use crate::core::EventRecord;
use std::sync::Arc;

pub use background::BackgroundSink;
pub use jsonl::{read_records, JsonlFileSink};
pub use memory::MemorySink;

/// Errors reported by sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The store cannot accept records right now
    Unavailable(String),
    /// Writing to local storage failed
    Io(String),
    /// The record could not be encoded
    Serialization(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Unavailable(msg) => write!(f, "Sink unavailable: {msg}"),
            SinkError::Io(msg) => write!(f, "Sink IO error: {msg}"),
            SinkError::Serialization(msg) => write!(f, "Sink serialization error: {msg}"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Durable destination for event records.
pub trait EventSink: Send + Sync {
    /// Accept one record.
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError>;

    /// Push any buffered records to the underlying store.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        (**self).emit(record)
    }

    fn flush(&self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        (**self).emit(record)
    }

    fn flush(&self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Sends every record to several sinks.
///
/// Every sink sees every record; the first failure is reported.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(record) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.flush() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
