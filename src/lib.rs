//! Ocular Sensor Agent - real-time operator eye monitoring.
//!
//! This library turns a stream of eye landmarks and eye-region intensity
//! grids into a debounced operator state (`Blinking`, `LEFT`, `RIGHT`,
//! `CENTER`), a running blink count and a prolonged-closure alarm.
//!
//! # Data Handling
//!
//! - **No images kept**: eye regions are reduced to two pixel counts per frame
//! - **No landmarks kept**: only the eye aspect ratio leaves feature extraction
//! - **Transparency**: all processing is counted in the monitoring log
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Ocular Sensor Agent                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────────┐     │
//! │  │   Capture   │──▶│  Features   │──▶│ Temporal State  │     │
//! │  │  (thread)   │   │ (EAR, gaze) │   │     Engine      │     │
//! │  └─────────────┘   └─────────────┘   └─────────────────┘     │
//! │                                              │               │
//! │                                              ▼               │
//! │  ┌─────────────┐                     ┌─────────────────┐     │
//! │  │ Monitoring  │◀────────────────────│     Session     │     │
//! │  │    Log      │                     │ (records, sink) │     │
//! │  └─────────────┘                     └─────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ocular_sensor_agent::{capture, core, sink, Config};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! let source = capture::ReplaySource::from_path("session.replay.jsonl")?;
//! let collector = capture::FrameCollector::start(source, Default::default())?;
//!
//! let sink = Arc::new(sink::MemorySink::new());
//! let mut session = core::MonitoringSession::new("operator", &Config::default(), sink);
//!
//! let running = AtomicBool::new(true);
//! core::run_session(collector.receiver(), &mut session, Instant::now(), &running, |step| {
//!     println!("{:?}", step.outcome.state());
//! });
//! println!("{}", session.finish());
//! # Ok::<(), ocular_sensor_agent::capture::CaptureError>(())
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod sink;
pub mod transparency;

#[cfg(feature = "gateway")]
pub mod gateway;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use capture::{CaptureError, CapturedFrame, FaceObservation, FrameCollector, FrameSource};
pub use config::{Config, ConfigError, EngineConfig, GazeConfig};
pub use core::{
    MonitoringSession, OcularEvent, OcularState, SessionSummary, StepOutcome, TemporalStateEngine,
};
pub use sink::{EventSink, SinkError};
pub use transparency::{MonitoringLog, MonitoringStats, SharedMonitoringLog};

// Gateway re-exports (when enabled)
#[cfg(feature = "gateway")]
pub use gateway::{GatewayClient, GatewayConfig, GatewayError, HttpSink};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Monitoring notice that can be displayed to operators.
pub const MONITORING_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║            OCULAR SENSOR AGENT - MONITORING NOTICE               ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent monitors eye state to detect fatigue and distraction.║
║                                                                  ║
║  ✓ WHAT WE RECORD (per frame):                                   ║
║    • Whether your eyes are open or closed                        ║
║    • Which way you are looking (left, right, center)             ║
║    • Blink counts and prolonged-closure alarms                   ║
║                                                                  ║
║  ✗ WHAT WE NEVER RECORD:                                         ║
║    • Camera images or video                                      ║
║    • Facial landmark coordinates                                 ║
║    • Anything outside the eye regions                            ║
║                                                                  ║
║  You can view monitoring statistics anytime with:                ║
║    ocular-sensor status                                          ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
