//! Background frame acquisition.
//!
//! A [`FrameCollector`] pulls frames from a [`FrameSource`] on a dedicated
//! thread and hands them to the classification loop over a bounded channel,
//! so acquisition never blocks feature extraction.

use crate::capture::{CaptureError, CapturedFrame, FrameSource};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Item delivered over the collector channel.
pub type CaptureResult = Result<CapturedFrame, CaptureError>;

/// Configuration for the capture thread.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Frames buffered before the capture thread blocks
    pub buffer_frames: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self { buffer_frames: 256 }
    }
}

/// Runs a frame source on its own thread.
///
/// The channel disconnects when the source reaches its end. A source error
/// is delivered as a final `Err` item before the disconnect.
pub struct FrameCollector {
    receiver: Receiver<CaptureResult>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FrameCollector {
    /// Start pulling frames from `source`.
    pub fn start<S>(mut source: S, config: CollectorConfig) -> Result<Self, CaptureError>
    where
        S: FrameSource + Send + 'static,
    {
        let (sender, receiver) = bounded(config.buffer_frames.max(1));
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = thread::Builder::new()
            .name("frame-capture".to_string())
            .spawn(move || {
                while flag.load(Ordering::SeqCst) {
                    match source.next_frame() {
                        Ok(Some(frame)) => {
                            if sender.send(Ok(frame)).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            tracing::debug!("Frame source reached end of stream");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("Frame source failed: {}", e);
                            let _ = sender.send(Err(e));
                            break;
                        }
                    }
                }
                flag.store(false, Ordering::SeqCst);
            })
            .map_err(|e| CaptureError::Io(format!("Failed to spawn capture thread: {e}")))?;

        Ok(Self {
            receiver,
            running,
            handle: Some(handle),
        })
    }

    /// Get the receiver for captured frames.
    pub fn receiver(&self) -> &Receiver<CaptureResult> {
        &self.receiver
    }

    /// Check if the capture thread is still producing frames.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop capturing and discard any buffered frames.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        // Unblock a pending send so the thread can observe the flag.
        while self
            .receiver
            .recv_timeout(Duration::from_millis(50))
            .is_ok()
        {}

        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
            // A live source stuck inside `next_frame` is left detached.
        }
    }
}

impl Drop for FrameCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Countdown(u32);

    impl FrameSource for Countdown {
        fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
            if self.0 == 0 {
                return Ok(None);
            }
            self.0 -= 1;
            Ok(Some(CapturedFrame {
                offset: Duration::from_millis(u64::from(self.0)),
                face: None,
            }))
        }
    }

    struct Failing;

    impl FrameSource for Failing {
        fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
            Err(CaptureError::SourceLost("camera unplugged".to_string()))
        }
    }

    #[test]
    fn test_collector_delivers_all_frames_then_disconnects() {
        let collector = FrameCollector::start(Countdown(5), CollectorConfig::default()).unwrap();
        let frames: Vec<_> = collector.receiver().iter().collect();
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|f| f.is_ok()));
    }

    #[test]
    fn test_collector_forwards_source_error() {
        let collector = FrameCollector::start(Failing, CollectorConfig::default()).unwrap();
        let items: Vec<_> = collector.receiver().iter().collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(CaptureError::SourceLost(_))));
    }

    #[test]
    fn test_stop_with_full_buffer() {
        let config = CollectorConfig { buffer_frames: 1 };
        let mut collector = FrameCollector::start(Countdown(1_000), config).unwrap();
        collector.stop();
        assert!(!collector.is_running());
    }
}
