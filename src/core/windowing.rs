//! Sliding-window segmentation of grouped records.
//!
//! Windows are fixed-length, contiguous slices of one group. A window never
//! spans two groups, and the truncated tail of a group is never emitted.

use crate::config::{ColumnConfig, WindowSizing};
use crate::core::partition::Group;
use crate::core::record::{GroupKey, Record};
use crate::stats::PipelineStats;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A read-only view over exactly one window's worth of records.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    key: &'a GroupKey,
    records: &'a [Record],
    columns: &'a ColumnConfig,
    /// Position of this window within its group
    index: usize,
    /// Record offset of the first record within its group
    offset: usize,
}

impl<'a> Window<'a> {
    pub fn key(&self) -> &'a GroupKey {
        self.key
    }

    pub fn records(&self) -> &'a [Record] {
        self.records
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of records in the window.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Time of the first record, if it has one.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.records.first().and_then(|r| r.time).and_then(to_datetime)
    }

    /// Time of the last record, if it has one.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.records.last().and_then(|r| r.time).and_then(to_datetime)
    }

    /// Values of a named column in row order.
    ///
    /// Resolves the configured axis names, the time column (as milliseconds,
    /// NaN where missing) and numeric passthrough columns.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        if name == self.columns.time {
            return Some(
                self.records
                    .iter()
                    .map(|r| r.time.map_or(f64::NAN, |t| t as f64))
                    .collect(),
            );
        }
        if let Some(axis) = self.columns.acc.iter().position(|c| c == name) {
            return Some(self.records.iter().map(|r| r.acc[axis]).collect());
        }
        if let Some(axis) = self.columns.gyr.iter().position(|c| c == name) {
            return Some(self.records.iter().map(|r| r.gyr[axis]).collect());
        }
        if self.records.iter().any(|r| r.extra.contains_key(name)) {
            return Some(
                self.records
                    .iter()
                    .map(|r| r.extra.get(name).copied().unwrap_or(f64::NAN))
                    .collect(),
            );
        }
        None
    }

    /// Serializable description of the window.
    pub fn summary(&self) -> WindowSummary {
        WindowSummary {
            subject: self.key.subject.to_string(),
            activity: self.key.activity.to_string(),
            index: self.index,
            offset: self.offset,
            records: self.records.len(),
            start: self.start(),
            end: self.end(),
        }
    }
}

/// Window metadata for export and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub subject: String,
    pub activity: String,
    pub index: usize,
    pub offset: usize,
    pub records: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

fn to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Lazy iterator over the windows of a set of groups.
///
/// Single pass: once exhausted it stays exhausted. Calling the segmenter
/// again starts a fresh scan.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    groups: &'a [Group],
    columns: &'a ColumnConfig,
    sizing: WindowSizing,
    stats: Option<&'a PipelineStats>,
    group: usize,
    offset: usize,
    index: usize,
    /// Truncated tail slices skipped so far
    dropped_tails: usize,
}

impl<'a> Windows<'a> {
    pub fn new(groups: &'a [Group], columns: &'a ColumnConfig, sizing: WindowSizing) -> Self {
        Self {
            groups,
            columns,
            sizing,
            stats: None,
            group: 0,
            offset: 0,
            index: 0,
            dropped_tails: 0,
        }
    }

    /// Count emitted and dropped windows in `stats` while iterating.
    pub fn with_stats(mut self, stats: &'a PipelineStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Number of short tail slices skipped so far.
    pub fn dropped_tails(&self) -> usize {
        self.dropped_tails
    }

    fn next_group(&mut self) {
        self.group += 1;
        self.offset = 0;
        self.index = 0;
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let WindowSizing {
            window_len,
            step_len,
        } = self.sizing;

        while let Some(group) = self.groups.get(self.group) {
            let end = self.offset + window_len;
            if end > group.len() {
                // A non-empty remainder is a truncated slice, never emitted.
                if self.offset < group.len() {
                    self.dropped_tails += 1;
                    if let Some(stats) = self.stats {
                        stats.record_windows_dropped(1);
                    }
                    tracing::trace!(
                        "Dropped {} trailing records of group {}",
                        group.len() - self.offset,
                        group.key
                    );
                }
                self.next_group();
                continue;
            }

            let window = Window {
                key: &group.key,
                records: &group.records[self.offset..end],
                columns: self.columns,
                index: self.index,
                offset: self.offset,
            };
            self.offset += step_len;
            self.index += 1;
            if let Some(stats) = self.stats {
                stats.record_window_emitted();
            }
            return Some(window);
        }
        None
    }
}

/// Number of full windows a group of `len` records yields.
pub fn window_count(len: usize, sizing: WindowSizing) -> usize {
    if len < sizing.window_len {
        0
    } else {
        (len - sizing.window_len) / sizing.step_len + 1
    }
}
