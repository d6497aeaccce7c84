//! Recorded landmark streams.
//!
//! A replay file is JSON Lines, one frame per line:
//!
//! ```text
//! {"t_ms": 0, "face": {"left_eye": [[x,y], ...6], "right_eye": [...], "left_region": {...}}}
//! {"t_ms": 33, "face": null}
//! ```
//!
//! `t_ms` is the monotonic offset from the start of the stream. A `null`
//! face means the detector found no face for that cycle.

use crate::capture::{CaptureError, CapturedFrame, FaceObservation, FrameSource};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::{Duration, Instant};

/// One line of a replay file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// Offset from stream start in milliseconds
    pub t_ms: u64,
    /// Detected face, if any
    #[serde(default)]
    pub face: Option<FaceObservation>,
}

impl From<ReplayFrame> for CapturedFrame {
    fn from(frame: ReplayFrame) -> Self {
        CapturedFrame {
            offset: Duration::from_millis(frame.t_ms),
            face: frame.face,
        }
    }
}

/// Frame source backed by a fully parsed replay stream.
pub struct ReplaySource {
    frames: std::vec::IntoIter<ReplayFrame>,
    /// Pace delivery to the recorded offsets
    realtime: bool,
    started: Option<Instant>,
    len: usize,
}

impl ReplaySource {
    /// Build a source from already decoded frames.
    pub fn new(frames: Vec<ReplayFrame>) -> Self {
        let len = frames.len();
        Self {
            frames: frames.into_iter(),
            realtime: false,
            started: None,
            len,
        }
    }

    /// Parse a replay stream. Blank lines are skipped; the first malformed
    /// line aborts with its 1-based line number.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, CaptureError> {
        let mut frames = Vec::new();
        let mut last_offset = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|e| CaptureError::Io(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }

            let frame: ReplayFrame =
                serde_json::from_str(&line).map_err(|e| CaptureError::Parse {
                    line: line_no,
                    message: e.to_string(),
                })?;

            if frame.t_ms < last_offset {
                return Err(CaptureError::Parse {
                    line: line_no,
                    message: format!(
                        "frame offset {}ms goes backwards (previous {}ms)",
                        frame.t_ms, last_offset
                    ),
                });
            }
            last_offset = frame.t_ms;
            frames.push(frame);
        }

        Ok(Self::new(frames))
    }

    /// Open and parse a replay file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            CaptureError::Io(format!("Failed to open {:?}: {e}", path.as_ref()))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Deliver frames at their recorded pace instead of as fast as possible.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Number of frames in the stream.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the stream has no frames.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        let Some(frame) = self.frames.next() else {
            return Ok(None);
        };

        if self.realtime {
            let started = *self.started.get_or_insert_with(Instant::now);
            let due = Duration::from_millis(frame.t_ms);
            let elapsed = started.elapsed();
            if due > elapsed {
                std::thread::sleep(due - elapsed);
            }
        }

        Ok(Some(frame.into()))
    }
}

/// Write frames as a replay stream.
pub fn write_replay<W: Write>(mut writer: W, frames: &[ReplayFrame]) -> std::io::Result<()> {
    for frame in frames {
        let line = serde_json::to_string(frame).map_err(std::io::Error::other)?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FACE_LINE: &str = r#"{"t_ms": 33, "face": {"left_eye": [[0,0],[2,-1],[4,-1],[6,0],[4,1],[2,1]], "right_eye": [[0,0],[2,-1],[4,-1],[6,0],[4,1],[2,1]], "left_region": {"width": 2, "height": 1, "pixels": [0, 255]}}}"#;

    #[test]
    fn test_parse_stream() {
        let input = format!("{{\"t_ms\": 0, \"face\": null}}\n\n{FACE_LINE}\n");
        let mut source = ReplaySource::from_reader(Cursor::new(input)).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert!(first.face.is_none());

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.offset, Duration::from_millis(33));
        let face = second.face.unwrap();
        assert!(face.left_region.is_some());
        assert!(face.right_region.is_none());

        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_parse_error_reports_line() {
        let input = "{\"t_ms\": 0}\n{\"t_ms\": \"soon\"}\n";
        match ReplaySource::from_reader(Cursor::new(input)) {
            Err(CaptureError::Parse { line, .. }) => assert_eq!(line, 2),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("expected parse error"),
        }
    }

    #[test]
    fn test_offsets_must_not_go_backwards() {
        let input = "{\"t_ms\": 100}\n{\"t_ms\": 50}\n";
        assert!(matches!(
            ReplaySource::from_reader(Cursor::new(input)),
            Err(CaptureError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_write_then_read() {
        let frames = vec![
            ReplayFrame {
                t_ms: 0,
                face: None,
            },
            ReplayFrame {
                t_ms: 40,
                face: None,
            },
        ];
        let mut buf = Vec::new();
        write_replay(&mut buf, &frames).unwrap();

        let source = ReplaySource::from_reader(Cursor::new(buf)).unwrap();
        assert_eq!(source.len(), 2);
    }
}
