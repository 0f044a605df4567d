//! Run statistics for the segmenter.
//!
//! Windows that do not fill up, rows without identity and unparsable
//! timestamps are dropped without raising errors. This module keeps count
//! of them so a run can be audited afterwards.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_stats, PipelineStats, SharedPipelineStats, StatsSnapshot};
