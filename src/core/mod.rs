//! Core functionality for the wearable segmenter.
//!
//! This module contains:
//! - Record types and (subject, activity) group keys
//! - Axis cleaning and timestamp normalization
//! - Partitioning, gap repair and resampling of groups
//! - Sliding-window segmentation and continuity checks

pub mod cleaning;
pub mod continuity;
pub mod partition;
pub mod record;
pub mod resample;
pub mod segmenter;
pub mod timestamp;
pub mod windowing;

// Re-export commonly used types
pub use continuity::{
    check_time_continuity, continuity_report, ContinuityReport, OutOfRangeDelta,
};
pub use partition::{partition, Group};
pub use record::{GroupKey, Label, Record};
pub use resample::{resample_group, ResampleStats};
pub use segmenter::{SegmenterError, TimeWindowSegmenter};
pub use timestamp::normalize_timestamp;
pub use windowing::{Window, WindowSummary, Windows};
