//! Configuration for the Ocular Sensor Agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// EAR below this value counts as a closed eye.
pub const EAR_THRESHOLD: f64 = 0.2;

/// Consecutive closed frames needed before a reopening counts as a blink.
pub const MIN_CONSEC_FRAMES: u32 = 3;

/// Continuous closure that raises the prolonged-closure alarm.
pub const ALARM_DURATION: Duration = Duration::from_secs(3);

/// Right/left foreground ratio below which the gaze reads `Right`.
pub const GAZE_LOW_RATIO: f64 = 0.8;

/// Right/left foreground ratio above which the gaze reads `Left`.
pub const GAZE_HIGH_RATIO: f64 = 1.2;

/// 8-bit intensity above which an eye-region pixel is foreground.
pub const BINARIZATION_THRESHOLD: u8 = 70;

/// Main configuration for the sensor agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Operator name stamped on every record
    pub operator_name: String,

    /// Blink and alarm tuning
    pub engine: EngineConfig,

    /// Gaze classifier tuning
    pub gaze: GazeConfig,

    /// Path for exported session records
    pub export_path: PathBuf,

    /// Path for storing the monitoring log
    pub data_path: PathBuf,

    /// Records kept in memory for the live history API
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ocular-sensor-agent");

        Self {
            operator_name: String::new(),
            engine: EngineConfig::default(),
            gaze: GazeConfig::default(),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
            history_limit: 500,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults
    /// when the file does not exist.
    pub fn load_from(config_path: &std::path::Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ocular-sensor-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Reject settings the classifiers cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.gaze.validate()
    }
}

/// Tuning for the temporal state engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// EAR below this value counts as closed
    pub ear_threshold: f64,
    /// Minimum closed run (in frames) that counts as a blink
    pub min_consec_frames: u32,
    /// Continuous closure that raises the alarm (milliseconds on disk)
    #[serde(with = "duration_serde")]
    pub alarm_duration: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ear_threshold: EAR_THRESHOLD,
            min_consec_frames: MIN_CONSEC_FRAMES,
            alarm_duration: ALARM_DURATION,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ear_threshold.is_finite() || self.ear_threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "ear_threshold must be a positive number, got {}",
                self.ear_threshold
            )));
        }
        if self.min_consec_frames == 0 {
            return Err(ConfigError::Invalid(
                "min_consec_frames must be at least 1".to_string(),
            ));
        }
        if self.alarm_duration.is_zero() {
            return Err(ConfigError::Invalid(
                "alarm_duration must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tuning for the gaze classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeConfig {
    /// Ratio below which gaze reads `Right`
    pub low_ratio: f64,
    /// Ratio above which gaze reads `Left`
    pub high_ratio: f64,
    /// Pixels brighter than this are foreground
    pub binarization_threshold: u8,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            low_ratio: GAZE_LOW_RATIO,
            high_ratio: GAZE_HIGH_RATIO,
            binarization_threshold: BINARIZATION_THRESHOLD,
        }
    }
}

impl GazeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite_positive = |v: f64| v.is_finite() && v > 0.0;
        if !finite_positive(self.low_ratio) || !finite_positive(self.high_ratio) {
            return Err(ConfigError::Invalid(
                "gaze ratios must be positive numbers".to_string(),
            ));
        }
        if self.low_ratio > self.high_ratio {
            return Err(ConfigError::Invalid(format!(
                "gaze low_ratio ({}) exceeds high_ratio ({})",
                self.low_ratio, self.high_ratio
            )));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration (stored as milliseconds).
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.ear_threshold, 0.2);
        assert_eq!(config.engine.min_consec_frames, 3);
        assert_eq!(config.engine.alarm_duration, Duration::from_secs(3));
        assert_eq!(config.gaze.low_ratio, 0.8);
        assert_eq!(config.gaze.high_ratio, 1.2);
        assert_eq!(config.gaze.binarization_threshold, 70);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_alarm_duration_serialized_as_millis() {
        let json = serde_json::to_value(EngineConfig::default()).unwrap();
        assert_eq!(json["alarm_duration"], 3000);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.operator_name = "shift-a".to_string();
        config.engine.alarm_duration = Duration::from_millis(2500);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.operator_name, "shift-a");
        assert_eq!(loaded.engine.alarm_duration, Duration::from_millis(2500));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.engine, EngineConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut engine = EngineConfig::default();
        engine.min_consec_frames = 0;
        assert!(matches!(engine.validate(), Err(ConfigError::Invalid(_))));

        let mut engine = EngineConfig::default();
        engine.ear_threshold = f64::NAN;
        assert!(engine.validate().is_err());

        let gaze = GazeConfig {
            low_ratio: 1.5,
            high_ratio: 1.2,
            binarization_threshold: 70,
        };
        assert!(gaze.validate().is_err());
    }
}
