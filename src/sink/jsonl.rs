//! JSON Lines file sink.
//!
//! Each record is appended as one line. Files written here are what
//! `ocular-sensor summary` reads back.

use crate::core::EventRecord;
use crate::sink::{EventSink, SinkError};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Appends records to a `.jsonl` file.
pub struct JsonlFileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlFileSink {
    /// Open (or create) the file for appending. Parent directories are created.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SinkError::Io(e.to_string()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SinkError::Io(format!("Failed to open {path:?}: {e}")))?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlFileSink {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        let line =
            serde_json::to_string(record).map_err(|e| SinkError::Serialization(e.to_string()))?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}").map_err(|e| SinkError::Io(e.to_string()))
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
            .map_err(|e| SinkError::Io(e.to_string()))
    }
}

impl Drop for JsonlFileSink {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("Failed to flush {:?}: {}", self.path, e);
        }
    }
}

/// Read every record from a `.jsonl` file. Blank lines are skipped.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<EventRecord>, SinkError> {
    let file = File::open(path.as_ref())
        .map_err(|e| SinkError::Io(format!("Failed to open {:?}: {e}", path.as_ref())))?;

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| SinkError::Io(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EventRecord = serde_json::from_str(&line).map_err(|e| {
            SinkError::Serialization(format!("line {}: {e}", idx + 1))
        })?;
        records.push(record);
    }
    Ok(records)
}
