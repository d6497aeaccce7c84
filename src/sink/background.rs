//! Fire-and-forget sink wrapper.
//!
//! A [`BackgroundSink`] hands records to a writer thread over a bounded
//! channel so a slow store never stalls the frame loop. When the channel is
//! full the record is refused rather than waited on.

use crate::core::EventRecord;
use crate::sink::{EventSink, SinkError};
use crossbeam_channel::{bounded, Sender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long `flush` waits for the writer thread.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

enum Message {
    Record(Box<EventRecord>),
    Flush(Sender<Result<(), SinkError>>),
}

/// Runs another sink on a dedicated writer thread.
pub struct BackgroundSink {
    sender: Mutex<Option<Sender<Message>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundSink {
    /// Spawn a writer thread feeding `inner`, buffering up to `capacity` records.
    pub fn spawn<S>(inner: S, capacity: usize) -> Result<Self, SinkError>
    where
        S: EventSink + 'static,
    {
        let (sender, receiver) = bounded::<Message>(capacity.max(1));
        let inner = Arc::new(inner);

        let handle = thread::Builder::new()
            .name("sink-writer".to_string())
            .spawn(move || {
                for message in receiver {
                    match message {
                        Message::Record(record) => {
                            if let Err(e) = inner.emit(&record) {
                                tracing::warn!("Background sink dropped a record: {}", e);
                            }
                        }
                        Message::Flush(ack) => {
                            let _ = ack.send(inner.flush());
                        }
                    }
                }
                if let Err(e) = inner.flush() {
                    tracing::warn!("Background sink final flush failed: {}", e);
                }
            })
            .map_err(|e| SinkError::Io(format!("Failed to spawn writer thread: {e}")))?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    fn sender(&self) -> Result<Sender<Message>, SinkError> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| SinkError::Unavailable("writer thread stopped".to_string()))
    }

    /// Stop accepting records and wait for the writer to drain.
    pub fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!("Sink writer thread panicked");
            }
        }
    }
}

impl EventSink for BackgroundSink {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        match self
            .sender()?
            .try_send(Message::Record(Box::new(record.clone())))
        {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                Err(SinkError::Unavailable("writer queue full".to_string()))
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(SinkError::Unavailable("writer thread stopped".to_string()))
            }
        }
    }

    fn flush(&self) -> Result<(), SinkError> {
        let (ack, done) = bounded(1);
        self.sender()?
            .send(Message::Flush(ack))
            .map_err(|_| SinkError::Unavailable("writer thread stopped".to_string()))?;
        done.recv_timeout(FLUSH_TIMEOUT)
            .map_err(|_| SinkError::Unavailable("flush timed out".to_string()))?
    }
}

impl Drop for BackgroundSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}
