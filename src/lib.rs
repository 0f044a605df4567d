//! Wearable Segmenter - uniform time windows from raw IMU recordings.
//!
//! This library turns irregularly sampled accelerometer and gyroscope
//! recordings, keyed by subject and activity, into fixed-length windows at a
//! known sampling rate, ready for feature extraction.
//!
//! # Guarantees
//!
//! - **No straddling**: a window never spans two (subject, activity) groups
//! - **Exact length**: every window holds `window_size * sampling_rate` records
//! - **No aborts on bad rows**: unparsable timestamps become missing values
//! - **Auditable**: everything dropped along the way is counted in [`stats`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Wearable Segmenter                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Source    │──▶│  Normalize  │──▶│  Partition  │       │
//! │  │ (json/csv)  │   │ (timestamps)│   │ (subj, act) │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │               │
//! │                                             ▼               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ Continuity  │◀──│  Windowing  │◀──│  Resample   │       │
//! │  │   check     │   │  (lazy)     │   │ (optional)  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use wearable_segmenter::{source, Config, TimeWindowSegmenter};
//!
//! let table = source::load_table(Path::new("recordings.jsonl")).expect("readable input");
//! let mut segmenter = TimeWindowSegmenter::new(Config::default(), &table).expect("valid config");
//!
//! // Optional: bring every group onto a 10 Hz grid
//! segmenter.resample_to(10.0).expect("valid rate");
//!
//! for window in segmenter.segment() {
//!     let ac_x = window.column("ac_x").unwrap_or_default();
//!     println!("{} #{}: {} samples", window.key(), window.index(), ac_x.len());
//! }
//! ```

pub mod config;
pub mod core;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{ColumnConfig, Config, ConfigError, WindowSizing};
pub use core::{
    check_time_continuity, ContinuityReport, Group, GroupKey, Label, Record, SegmenterError,
    TimeWindowSegmenter, Window, WindowSummary, Windows,
};
pub use source::{load_table, RawTable, SourceError};
pub use stats::{PipelineStats, SharedPipelineStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
