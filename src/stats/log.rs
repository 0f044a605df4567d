//! Pipeline statistics.
//!
//! Counts what happened to the data on its way from the input table to the
//! emitted windows, including everything that was dropped silently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one segmentation run, optionally persisted across runs.
#[derive(Debug)]
pub struct PipelineStats {
    /// Rows read from the input
    records_loaded: AtomicU64,
    /// Rows whose timestamp could not be parsed
    invalid_timestamps: AtomicU64,
    /// Rows without a subject or activity
    records_without_identity: AtomicU64,
    /// (subject, activity) groups found
    groups: AtomicU64,
    /// Records produced by resampling
    records_resampled: AtomicU64,
    /// Source-grid gaps filled by interpolation
    gaps_filled: AtomicU64,
    /// Records discarded by timestamp deduplication
    duplicates_dropped: AtomicU64,
    /// Full windows handed to the consumer
    windows_emitted: AtomicU64,
    /// Truncated tail slices skipped
    windows_dropped: AtomicU64,
    /// Run start time
    run_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl PipelineStats {
    /// Create a fresh set of counters.
    pub fn new() -> Self {
        Self {
            records_loaded: AtomicU64::new(0),
            invalid_timestamps: AtomicU64::new(0),
            records_without_identity: AtomicU64::new(0),
            groups: AtomicU64::new(0),
            records_resampled: AtomicU64::new(0),
            gaps_filled: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
            windows_emitted: AtomicU64::new(0),
            windows_dropped: AtomicU64::new(0),
            run_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create counters that continue from, and save back to, a file.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous pipeline stats: {e}");
        }

        stats
    }

    pub fn record_loaded(&self, count: u64) {
        self.records_loaded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_invalid_timestamps(&self, count: u64) {
        self.invalid_timestamps.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_without_identity(&self, count: u64) {
        self.records_without_identity
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_groups(&self, count: u64) {
        self.groups.fetch_add(count, Ordering::Relaxed);
    }

    /// Record the outcome of a resampling pass.
    pub fn record_resampled(&self, records: u64, gaps_filled: u64, duplicates: u64) {
        self.records_resampled.fetch_add(records, Ordering::Relaxed);
        self.gaps_filled.fetch_add(gaps_filled, Ordering::Relaxed);
        self.duplicates_dropped
            .fetch_add(duplicates, Ordering::Relaxed);
    }

    /// Record a window handed to the consumer.
    pub fn record_window_emitted(&self) {
        self.windows_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record skipped tail slices.
    pub fn record_windows_dropped(&self, count: u64) {
        self.windows_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            records_loaded: self.records_loaded.load(Ordering::Relaxed),
            invalid_timestamps: self.invalid_timestamps.load(Ordering::Relaxed),
            records_without_identity: self.records_without_identity.load(Ordering::Relaxed),
            groups: self.groups.load(Ordering::Relaxed),
            records_resampled: self.records_resampled.load(Ordering::Relaxed),
            gaps_filled: self.gaps_filled.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            windows_emitted: self.windows_emitted.load(Ordering::Relaxed),
            windows_dropped: self.windows_dropped.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_ms: (Utc::now() - self.run_start).num_milliseconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Pipeline Statistics:\n\
             - Records loaded: {}\n\
             - Invalid timestamps: {}\n\
             - Records without subject/activity: {}\n\
             - Groups: {}\n\
             - Records after resampling: {}\n\
             - Gaps filled: {}\n\
             - Duplicate timestamps dropped: {}\n\
             - Windows emitted: {}\n\
             - Tail slices dropped: {}\n\
             - Run duration: {} ms",
            stats.records_loaded,
            stats.invalid_timestamps,
            stats.records_without_identity,
            stats.groups,
            stats.records_resampled,
            stats.gaps_filled,
            stats.duplicates_dropped,
            stats.windows_emitted,
            stats.windows_dropped,
            stats.run_duration_ms
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                records_loaded: stats.records_loaded,
                invalid_timestamps: stats.invalid_timestamps,
                records_without_identity: stats.records_without_identity,
                groups: stats.groups,
                records_resampled: stats.records_resampled,
                gaps_filled: stats.gaps_filled,
                duplicates_dropped: stats.duplicates_dropped,
                windows_emitted: stats.windows_emitted,
                windows_dropped: stats.windows_dropped,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.records_loaded
                    .store(persisted.records_loaded, Ordering::Relaxed);
                self.invalid_timestamps
                    .store(persisted.invalid_timestamps, Ordering::Relaxed);
                self.records_without_identity
                    .store(persisted.records_without_identity, Ordering::Relaxed);
                self.groups.store(persisted.groups, Ordering::Relaxed);
                self.records_resampled
                    .store(persisted.records_resampled, Ordering::Relaxed);
                self.gaps_filled
                    .store(persisted.gaps_filled, Ordering::Relaxed);
                self.duplicates_dropped
                    .store(persisted.duplicates_dropped, Ordering::Relaxed);
                self.windows_emitted
                    .store(persisted.windows_emitted, Ordering::Relaxed);
                self.windows_dropped
                    .store(persisted.windows_dropped, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Add the counters of another run to these.
    pub fn absorb(&self, run: &StatsSnapshot) {
        self.records_loaded
            .fetch_add(run.records_loaded, Ordering::Relaxed);
        self.invalid_timestamps
            .fetch_add(run.invalid_timestamps, Ordering::Relaxed);
        self.records_without_identity
            .fetch_add(run.records_without_identity, Ordering::Relaxed);
        self.groups.fetch_add(run.groups, Ordering::Relaxed);
        self.records_resampled
            .fetch_add(run.records_resampled, Ordering::Relaxed);
        self.gaps_filled.fetch_add(run.gaps_filled, Ordering::Relaxed);
        self.duplicates_dropped
            .fetch_add(run.duplicates_dropped, Ordering::Relaxed);
        self.windows_emitted
            .fetch_add(run.windows_emitted, Ordering::Relaxed);
        self.windows_dropped
            .fetch_add(run.windows_dropped, Ordering::Relaxed);
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.records_loaded,
            &self.invalid_timestamps,
            &self.records_without_identity,
            &self.groups,
            &self.records_resampled,
            &self.gaps_filled,
            &self.duplicates_dropped,
            &self.windows_emitted,
            &self.windows_dropped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub records_loaded: u64,
    pub invalid_timestamps: u64,
    pub records_without_identity: u64,
    pub groups: u64,
    pub records_resampled: u64,
    pub gaps_filled: u64,
    pub duplicates_dropped: u64,
    pub windows_emitted: u64,
    pub windows_dropped: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_ms: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    records_loaded: u64,
    invalid_timestamps: u64,
    #[serde(default)]
    records_without_identity: u64,
    groups: u64,
    records_resampled: u64,
    gaps_filled: u64,
    duplicates_dropped: u64,
    windows_emitted: u64,
    windows_dropped: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared statistics.
pub type SharedPipelineStats = Arc<PipelineStats>;

/// Create new shared statistics.
pub fn create_shared_stats() -> SharedPipelineStats {
    Arc::new(PipelineStats::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counting() {
        let stats = PipelineStats::new();

        stats.record_loaded(10);
        stats.record_window_emitted();
        stats.record_window_emitted();
        stats.record_windows_dropped(1);
        stats.record_resampled(8, 2, 1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.records_loaded, 10);
        assert_eq!(snapshot.windows_emitted, 2);
        assert_eq!(snapshot.windows_dropped, 1);
        assert_eq!(snapshot.records_resampled, 8);
        assert_eq!(snapshot.gaps_filled, 2);
        assert_eq!(snapshot.duplicates_dropped, 1);
    }

    #[test]
    fn test_stats_reset() {
        let stats = PipelineStats::new();

        stats.record_loaded(100);
        stats.record_invalid_timestamps(5);
        stats.reset();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.records_loaded, 0);
        assert_eq!(snapshot.invalid_timestamps, 0);
    }

    #[test]
    fn test_summary_format() {
        let stats = PipelineStats::new();
        let summary = stats.summary();

        assert!(summary.contains("Records loaded"));
        assert!(summary.contains("Windows emitted"));
        assert!(summary.contains("Tail slices dropped"));
    }

    #[test]
    fn test_run_counters_fold_into_totals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let totals = PipelineStats::with_persistence(path.clone());
        totals.record_loaded(100);
        totals.save().unwrap();

        let run = PipelineStats::new();
        run.record_loaded(7);
        run.record_window_emitted();
        assert_eq!(run.snapshot().records_loaded, 7);

        let totals = PipelineStats::with_persistence(path.clone());
        totals.absorb(&run.snapshot());
        totals.save().unwrap();

        let reloaded = PipelineStats::with_persistence(path);
        assert_eq!(reloaded.snapshot().records_loaded, 107);
        assert_eq!(reloaded.snapshot().windows_emitted, 1);

        reloaded.reset();
        reloaded.save().unwrap();
        assert_eq!(reloaded.snapshot().records_loaded, 0);
    }

    #[test]
    fn test_persistence_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let first = PipelineStats::with_persistence(path.clone());
        first.record_window_emitted();
        first.save().unwrap();

        let second = PipelineStats::with_persistence(path);
        second.record_window_emitted();
        assert_eq!(second.snapshot().windows_emitted, 2);
    }
}
