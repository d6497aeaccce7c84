//! Monitoring transparency for the Ocular Sensor Agent.
//!
//! Tracks what the agent has measured and exported so operators can see
//! exactly what is collected about them.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, MonitoringLog, MonitoringStats,
    SharedMonitoringLog,
};
