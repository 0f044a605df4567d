//! Configuration for the wearable segmenter.

use crate::core::segmenter::SegmenterError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Length of each window in seconds
    pub window_size: f64,

    /// Stride between consecutive window starts in seconds
    pub step_size: f64,

    /// Nominal sampling rate of the input in Hz
    pub sampling_rate: f64,

    /// Names of the columns read from the input
    pub columns: ColumnConfig,

    /// Strip stray characters from axis cells before coercing them to numbers
    pub clean_columns: bool,

    /// Normalize timestamps and sort by (subject, activity, time)
    pub fix_timestamps: bool,

    /// Path for storing cumulative run statistics
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wearable-segmenter");

        Self {
            window_size: 10.0,
            step_size: 10.0,
            sampling_rate: 20.0,
            columns: ColumnConfig::default(),
            clean_columns: true,
            fix_timestamps: true,
            data_path: data_dir,
        }
    }
}

/// Record counts derived from the window and step durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSizing {
    /// Records per window
    pub window_len: usize,
    /// Records between window starts
    pub step_len: usize,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wearable-segmenter")
            .join("config.json")
    }

    /// Ensure the statistics directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Window and step sizes in records at the configured sampling rate.
    pub fn sizing(&self) -> Result<WindowSizing, SegmenterError> {
        self.sizing_at(self.sampling_rate)
    }

    /// Window and step sizes in records at an arbitrary rate.
    ///
    /// Both products must be positive whole numbers of records.
    pub fn sizing_at(&self, rate: f64) -> Result<WindowSizing, SegmenterError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(SegmenterError::InvalidRate { rate });
        }
        let window_len =
            record_count(self.window_size, rate).ok_or(SegmenterError::NonIntegralWindow {
                what: "window_size",
                seconds: self.window_size,
                rate,
            })?;
        let step_len =
            record_count(self.step_size, rate).ok_or(SegmenterError::NonIntegralWindow {
                what: "step_size",
                seconds: self.step_size,
                rate,
            })?;
        Ok(WindowSizing {
            window_len,
            step_len,
        })
    }
}

/// Whole number of records covering `seconds` at `rate`, if there is one.
fn record_count(seconds: f64, rate: f64) -> Option<usize> {
    let product = seconds * rate;
    let rounded = product.round();
    if !product.is_finite() || rounded < 1.0 || (product - rounded).abs() > 1e-9 {
        return None;
    }
    Some(rounded as usize)
}

/// Names of the input columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub time: String,
    pub id: String,
    pub activity: String,
    pub acc: [String; 3],
    pub gyr: [String; 3],
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            time: "Timestamp".to_string(),
            id: "Subject-id".to_string(),
            activity: "Activity Label".to_string(),
            acc: ["ac_x".to_string(), "ac_y".to_string(), "ac_z".to_string()],
            gyr: ["g_x".to_string(), "g_y".to_string(), "g_z".to_string()],
        }
    }
}

impl ColumnConfig {
    /// Parse an axis triple from a comma-separated string such as `"ac_x,ac_y,ac_z"`.
    pub fn parse_triple(s: &str) -> Option<[String; 3]> {
        let parts: Vec<String> = s.split(',').map(|p| p.trim().to_string()).collect();
        match parts.as_slice() {
            [x, y, z] if !x.is_empty() && !y.is_empty() && !z.is_empty() => {
                Some([x.clone(), y.clone(), z.clone()])
            }
            _ => None,
        }
    }

    /// All six axis column names, accelerometer first.
    pub fn axis_columns(&self) -> impl Iterator<Item = &String> {
        self.acc.iter().chain(self.gyr.iter())
    }

    /// Check whether a column is one of the named ones.
    pub fn is_named(&self, column: &str) -> bool {
        column == self.time
            || column == self.id
            || column == self.activity
            || self.axis_columns().any(|c| c == column)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window_size, 10.0);
        assert_eq!(config.sampling_rate, 20.0);
        assert_eq!(config.columns.time, "Timestamp");
        assert!(config.clean_columns);
        assert!(config.fix_timestamps);
    }

    #[test]
    fn test_sizing() {
        let config = Config::default();
        let sizing = config.sizing().unwrap();
        assert_eq!(sizing.window_len, 200);
        assert_eq!(sizing.step_len, 200);

        let config = Config {
            window_size: 2.5,
            step_size: 0.5,
            ..Config::default()
        };
        let sizing = config.sizing_at(10.0).unwrap();
        assert_eq!(sizing.window_len, 25);
        assert_eq!(sizing.step_len, 5);
    }

    #[test]
    fn test_non_integral_sizing_rejected() {
        let config = Config {
            window_size: 0.33,
            ..Config::default()
        };
        assert!(matches!(
            config.sizing(),
            Err(SegmenterError::NonIntegralWindow {
                what: "window_size",
                ..
            })
        ));

        let config = Config {
            step_size: 0.0,
            ..Config::default()
        };
        assert!(matches!(
            config.sizing(),
            Err(SegmenterError::NonIntegralWindow {
                what: "step_size",
                ..
            })
        ));

        assert!(matches!(
            Config::default().sizing_at(0.0),
            Err(SegmenterError::InvalidRate { .. })
        ));
    }

    #[test]
    fn test_parse_triple() {
        assert_eq!(
            ColumnConfig::parse_triple("x, y ,z"),
            Some(["x".to_string(), "y".to_string(), "z".to_string()])
        );
        assert_eq!(ColumnConfig::parse_triple("x,y"), None);
        assert_eq!(ColumnConfig::parse_triple("x,,z"), None);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"window_size": 5.0}"#).unwrap();
        assert_eq!(config.window_size, 5.0);
        assert_eq!(config.step_size, 10.0);
        assert_eq!(config.columns, ColumnConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            sampling_rate: 50.0,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
