//! The time-window segmenter.
//!
//! Owns the configuration and the dataset in partitioned form, and drives
//! the optional resampling stage and window segmentation:
//!
//! ```text
//! RawTable ──▶ clean + normalize ──▶ partition ──▶ [resample_to] ──▶ segment()
//! ```

use crate::config::{Config, WindowSizing};
use crate::core::cleaning::coerce_numeric;
use crate::core::continuity::{continuity_report, ContinuityReport};
use crate::core::partition::{partition, Group};
use crate::core::record::{GroupKey, Label, Record};
use crate::core::resample::{period_ms, resample_groups, ResampleStats};
use crate::core::timestamp::{normalize_timestamp, read_epoch_ms, sort_records};
use crate::core::windowing::Windows;
use crate::source::RawTable;
use crate::stats::{create_shared_stats, SharedPipelineStats};
use serde_json::Value;

/// Errors raised by the segmenter. All of them are configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmenterError {
    /// A required column is absent from the input
    MissingColumn { column: String },
    /// A duration does not map to a positive whole number of records
    NonIntegralWindow {
        what: &'static str,
        seconds: f64,
        rate: f64,
    },
    /// A sampling rate is not positive or its period is below one millisecond
    InvalidRate { rate: f64 },
}

impl std::fmt::Display for SegmenterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmenterError::MissingColumn { column } => {
                write!(f, "Required column {column:?} not found in input")
            }
            SegmenterError::NonIntegralWindow {
                what,
                seconds,
                rate,
            } => write!(
                f,
                "{what} of {seconds}s at {rate} Hz is not a positive whole number of records"
            ),
            SegmenterError::InvalidRate { rate } => {
                write!(f, "Invalid sampling rate: {rate} Hz")
            }
        }
    }
}

impl std::error::Error for SegmenterError {}

/// Segments a sensor dataset into fixed-length windows per (subject, activity).
#[derive(Debug)]
pub struct TimeWindowSegmenter {
    config: Config,
    /// Current sampling rate; changes after resampling
    sampling_rate: f64,
    sizing: WindowSizing,
    groups: Vec<Group>,
    stats: SharedPipelineStats,
}

impl TimeWindowSegmenter {
    /// Build a segmenter from a raw table.
    ///
    /// Window sizing and required columns are validated here, before any row
    /// is processed.
    pub fn new(config: Config, table: &RawTable) -> Result<Self, SegmenterError> {
        Self::with_stats(config, table, create_shared_stats())
    }

    /// Build a segmenter that reports into shared statistics.
    pub fn with_stats(
        config: Config,
        table: &RawTable,
        stats: SharedPipelineStats,
    ) -> Result<Self, SegmenterError> {
        let sizing = config.sizing()?;
        let records = records_from_table(&config, table, &stats)?;
        Ok(Self::assemble(config, sizing, records, stats))
    }

    /// Build a segmenter from records that are already typed.
    ///
    /// When `fix_timestamps` is set the records are sorted by
    /// (subject, activity, time) first.
    pub fn from_records(config: Config, mut records: Vec<Record>) -> Result<Self, SegmenterError> {
        let sizing = config.sizing()?;
        let stats = create_shared_stats();
        stats.record_loaded(records.len() as u64);
        stats.record_invalid_timestamps(records.iter().filter(|r| r.time.is_none()).count() as u64);
        if config.fix_timestamps {
            sort_records(&mut records);
        }
        Ok(Self::assemble(config, sizing, records, stats))
    }

    fn assemble(
        config: Config,
        sizing: WindowSizing,
        records: Vec<Record>,
        stats: SharedPipelineStats,
    ) -> Self {
        let groups = partition(records);
        stats.record_groups(groups.len() as u64);
        tracing::info!(
            "Partitioned dataset into {} groups ({} records per window, step {})",
            groups.len(),
            sizing.window_len,
            sizing.step_len
        );

        Self {
            sampling_rate: config.sampling_rate,
            config,
            sizing,
            groups,
            stats,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current sampling rate in Hz.
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Window and step lengths in records at the current rate.
    pub fn sizing(&self) -> WindowSizing {
        self.sizing
    }

    /// Groups in key order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Look up one group.
    pub fn group(&self, key: &GroupKey) -> Option<&Group> {
        self.groups
            .binary_search_by(|g| g.key.cmp(key))
            .ok()
            .map(|i| &self.groups[i])
    }

    /// All records, group after group.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.groups.iter().flat_map(|g| g.records.iter())
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Group::is_empty)
    }

    pub fn stats(&self) -> &SharedPipelineStats {
        &self.stats
    }

    /// Resample every group to `target_rate_hz`, replacing the dataset.
    ///
    /// Gaps on the source grid are filled by linear interpolation, then
    /// samples are averaged into buckets of the target period. Afterwards
    /// windows are sized at the new rate. Nothing changes if the new rate is
    /// rejected.
    pub fn resample_to(&mut self, target_rate_hz: f64) -> Result<ResampleStats, SegmenterError> {
        let source_period = period_ms(self.sampling_rate).ok_or(SegmenterError::InvalidRate {
            rate: self.sampling_rate,
        })?;
        let target_period = period_ms(target_rate_hz).ok_or(SegmenterError::InvalidRate {
            rate: target_rate_hz,
        })?;
        let sizing = self.config.sizing_at(target_rate_hz)?;

        tracing::info!(
            "Resampling {} groups from {} Hz ({} ms) to {} Hz ({} ms)",
            self.groups.len(),
            self.sampling_rate,
            source_period,
            target_rate_hz,
            target_period
        );

        let (groups, stats) = resample_groups(&self.groups, source_period, target_period);
        self.stats.record_resampled(
            stats.output_records as u64,
            stats.gaps_filled as u64,
            stats.duplicates as u64,
        );
        if stats.invalid_time > 0 {
            tracing::warn!(
                "Dropped {} records without a valid timestamp while resampling",
                stats.invalid_time
            );
        }

        self.groups = groups;
        self.sampling_rate = target_rate_hz;
        self.sizing = sizing;
        Ok(stats)
    }

    /// Lazily produce every full window, group by group.
    ///
    /// Each call starts a fresh scan; dropping the iterator stops early.
    pub fn segment(&self) -> Windows<'_> {
        Windows::new(&self.groups, &self.config.columns, self.sizing).with_stats(&self.stats)
    }

    /// Continuity of every group at the current rate.
    pub fn check_continuity(&self, tolerance_ms: f64) -> Vec<(GroupKey, ContinuityReport)> {
        self.groups
            .iter()
            .map(|g| {
                (
                    g.key.clone(),
                    continuity_report(&g.records, self.sampling_rate, tolerance_ms),
                )
            })
            .collect()
    }
}

/// Turn raw rows into typed records.
///
/// Rows without a subject or activity are skipped. Timestamps are normalized
/// and the records sorted when `fix_timestamps` is set.
pub fn records_from_table(
    config: &Config,
    table: &RawTable,
    stats: &SharedPipelineStats,
) -> Result<Vec<Record>, SegmenterError> {
    let columns = &config.columns;

    if !table.is_empty() {
        for required in [&columns.time, &columns.id, &columns.activity] {
            if !table.has_column(required) {
                return Err(SegmenterError::MissingColumn {
                    column: required.clone(),
                });
            }
        }
        for axis in columns.axis_columns() {
            if !table.has_column(axis) {
                tracing::warn!("Axis column {axis:?} not found, values will be NaN");
            }
        }
    }

    if config.fix_timestamps {
        tracing::info!("Fixing timestamps...");
    }

    let mut records = Vec::with_capacity(table.len());
    let mut invalid_timestamps = 0_u64;
    let mut without_identity = 0_u64;

    for row in table.rows() {
        let cell = |name: &str| row.get(name).unwrap_or(&Value::Null);

        let (Some(subject), Some(activity)) = (
            Label::from_value(cell(&columns.id)),
            Label::from_value(cell(&columns.activity)),
        ) else {
            without_identity += 1;
            continue;
        };

        let time = if config.fix_timestamps {
            normalize_timestamp(cell(&columns.time))
        } else {
            read_epoch_ms(cell(&columns.time))
        };
        if time.is_none() {
            invalid_timestamps += 1;
        }

        let axis = |names: &[String; 3]| {
            [
                coerce_numeric(cell(&names[0]), config.clean_columns),
                coerce_numeric(cell(&names[1]), config.clean_columns),
                coerce_numeric(cell(&names[2]), config.clean_columns),
            ]
        };

        let mut record = Record {
            time,
            subject,
            activity,
            acc: axis(&columns.acc),
            gyr: axis(&columns.gyr),
            extra: Default::default(),
            text: Default::default(),
        };

        for (name, value) in row.iter().filter(|(name, _)| !columns.is_named(name)) {
            match value {
                Value::Null => {}
                Value::Number(n) => {
                    record
                        .extra
                        .insert(name.clone(), n.as_f64().unwrap_or(f64::NAN));
                }
                Value::String(s) => match s.trim().parse::<f64>() {
                    Ok(v) => {
                        record.extra.insert(name.clone(), v);
                    }
                    Err(_) => {
                        record.text.insert(name.clone(), s.clone());
                    }
                },
                other => {
                    record.text.insert(name.clone(), other.to_string());
                }
            }
        }

        records.push(record);
    }

    stats.record_loaded(table.len() as u64);
    stats.record_invalid_timestamps(invalid_timestamps);
    stats.record_without_identity(without_identity);
    if without_identity > 0 {
        tracing::warn!("Skipped {without_identity} rows without subject or activity");
    }
    if invalid_timestamps > 0 {
        tracing::warn!("{invalid_timestamps} rows have an unparsable timestamp");
    }

    if config.fix_timestamps {
        sort_records(&mut records);
        tracing::info!("Done fixing timestamps.");
    }

    Ok(records)
}
