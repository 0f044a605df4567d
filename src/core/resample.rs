//! Gap repair and resampling of groups onto a uniform time grid.
//!
//! Each group is first snapped onto an ideal grid at the source period, with
//! missing slots filled by linear interpolation, then aggregated into buckets
//! of the target period by arithmetic mean.

use crate::core::partition::Group;
use crate::core::record::Record;
use crate::core::timestamp::is_valid_epoch_ms;
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet};

/// Milliseconds in a day. Target buckets are anchored at UTC midnight.
const DAY_MS: i64 = 86_400_000;

/// Number of numeric sensor axes carried by every record.
const AXES: usize = 6;

/// Sampling period in whole milliseconds for a rate in Hz.
///
/// Returns `None` when the rate is not positive or the period would be
/// shorter than one millisecond.
pub fn period_ms(rate_hz: f64) -> Option<i64> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return None;
    }
    let period = (1000.0 / rate_hz) as i64;
    (period >= 1).then_some(period)
}

/// Round `time` to the nearest multiple of `period`, ties to even.
pub fn round_to_period(time: i64, period: i64) -> i64 {
    let quotient = time.div_euclid(period);
    let remainder = time.rem_euclid(period);
    let twice = remainder * 2;
    let quotient = if twice > period || (twice == period && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    };
    quotient * period
}

/// Bookkeeping for one resampled group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResampleStats {
    /// Records without a valid time, including out-of-range ones
    pub invalid_time: usize,
    /// Records whose rounded time collided with an earlier record
    pub duplicates: usize,
    /// Ideal source-grid slots that had no record
    pub gaps_filled: usize,
    /// Records emitted at the target period
    pub output_records: usize,
}

impl ResampleStats {
    pub fn merge(&mut self, other: &ResampleStats) {
        self.invalid_time += other.invalid_time;
        self.duplicates += other.duplicates;
        self.gaps_filled += other.gaps_filled;
        self.output_records += other.output_records;
    }
}

/// Resample a single group from `source_period` to `target_period` (both in ms).
///
/// Records without a time, or with a time beyond 13 digits, are dropped. A
/// group with no valid time produces an empty group.
pub fn resample_group(
    group: &Group,
    source_period: i64,
    target_period: i64,
) -> (Group, ResampleStats) {
    let mut stats = ResampleStats::default();

    // Snap to the source grid; the first record wins a collision.
    let mut slots: BTreeMap<i64, &Record> = BTreeMap::new();
    for record in &group.records {
        match record.time {
            Some(t) if is_valid_epoch_ms(t) => {
                let rounded = round_to_period(t, source_period);
                if slots.contains_key(&rounded) {
                    stats.duplicates += 1;
                } else {
                    slots.insert(rounded, record);
                }
            }
            _ => stats.invalid_time += 1,
        }
    }

    let (start, end) = match (slots.keys().next(), slots.keys().next_back()) {
        (Some(&start), Some(&end)) => (start, end),
        _ => {
            tracing::warn!(
                "Group {} has no valid timestamps, nothing to resample",
                group.key
            );
            return (Group::new(group.key.clone(), Vec::new()), stats);
        }
    };

    let slot_count = ((end - start) / source_period) as usize + 1;
    stats.gaps_filled = slot_count - slots.len();

    let extra_names: Vec<String> = slots
        .values()
        .flat_map(|r| r.extra.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut columns = vec![vec![f64::NAN; slot_count]; AXES + extra_names.len()];
    for (&time, record) in &slots {
        let slot = ((time - start) / source_period) as usize;
        for axis in 0..3 {
            columns[axis][slot] = record.acc[axis];
            columns[axis + 3][slot] = record.gyr[axis];
        }
        for (offset, name) in extra_names.iter().enumerate() {
            if let Some(&value) = record.extra.get(name) {
                columns[AXES + offset][slot] = value;
            }
        }
    }

    for column in &mut columns {
        interpolate_linear(column);
    }

    // Buckets at the target period, anchored at midnight of the first day.
    let origin = start.div_euclid(DAY_MS) * DAY_MS;
    let bucket_of = |t: i64| origin + (t - origin).div_euclid(target_period) * target_period;
    let first_bucket = bucket_of(start);
    let bucket_count = ((bucket_of(end) - first_bucket) / target_period) as usize + 1;

    let mut records = Vec::with_capacity(bucket_count);
    for bucket in 0..bucket_count {
        let bucket_start = first_bucket + bucket as i64 * target_period;
        let lo = div_ceil(bucket_start - start, source_period).clamp(0, slot_count as i64) as usize;
        let hi = div_ceil(bucket_start + target_period - start, source_period)
            .clamp(0, slot_count as i64) as usize;

        let means: Vec<f64> = columns
            .iter()
            .map(|column| bucket_mean(&column[lo..hi]))
            .collect();

        let mut record = Record::new(
            Some(bucket_start),
            &group.key,
            [means[0], means[1], means[2]],
            [means[3], means[4], means[5]],
        );
        for (offset, name) in extra_names.iter().enumerate() {
            record.extra.insert(name.clone(), means[AXES + offset]);
        }
        records.push(record);
    }

    stats.output_records = records.len();
    tracing::debug!(
        "Resampled group {}: {} slots -> {} records ({} gaps filled, {} duplicates, {} invalid)",
        group.key,
        slot_count,
        records.len(),
        stats.gaps_filled,
        stats.duplicates,
        stats.invalid_time
    );

    (Group::new(group.key.clone(), records), stats)
}

/// Resample every group, keeping group order and dropping groups left empty.
pub fn resample_groups(
    groups: &[Group],
    source_period: i64,
    target_period: i64,
) -> (Vec<Group>, ResampleStats) {
    let mut total = ResampleStats::default();
    let mut output = Vec::with_capacity(groups.len());
    for group in groups {
        let (resampled, stats) = resample_group(group, source_period, target_period);
        total.merge(&stats);
        if !resampled.is_empty() {
            output.push(resampled);
        }
    }
    (output, total)
}

/// Fill NaN runs by linear interpolation between the surrounding known values.
///
/// A trailing run repeats the last known value; a leading run stays NaN.
pub fn interpolate_linear(values: &mut [f64]) {
    let mut last_known: Option<usize> = None;
    for i in 0..values.len() {
        if values[i].is_nan() {
            continue;
        }
        if let Some(j) = last_known {
            let span = (i - j) as f64;
            let (from, to) = (values[j], values[i]);
            for k in (j + 1)..i {
                values[k] = from + (to - from) * ((k - j) as f64 / span);
            }
        }
        last_known = Some(i);
    }
    if let Some(j) = last_known {
        let last = values[j];
        for value in values.iter_mut().skip(j + 1) {
            *value = last;
        }
    }
}

fn bucket_mean(values: &[f64]) -> f64 {
    values.iter().filter(|v| !v.is_nan()).mean()
}

fn div_ceil(numerator: i64, denominator: i64) -> i64 {
    -(-numerator).div_euclid(denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::GroupKey;

    fn group_at(times: &[Option<i64>], values: &[f64]) -> Group {
        let key = GroupKey::new(1, "walk");
        let records = times
            .iter()
            .zip(values)
            .map(|(&t, &v)| Record::new(t, &key, [v, v * 2.0, -v], [v; 3]))
            .collect();
        Group::new(key, records)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_period_ms() {
        assert_eq!(period_ms(20.0), Some(50));
        assert_eq!(period_ms(30.0), Some(33));
        assert_eq!(period_ms(2000.0), None);
        assert_eq!(period_ms(0.0), None);
        assert_eq!(period_ms(-5.0), None);
    }

    #[test]
    fn test_round_to_period_ties_to_even() {
        assert_eq!(round_to_period(74, 50), 50);
        assert_eq!(round_to_period(76, 50), 100);
        assert_eq!(round_to_period(25, 50), 0);
        assert_eq!(round_to_period(75, 50), 100);
        assert_eq!(round_to_period(125, 50), 100);
    }

    #[test]
    fn test_interpolate_linear() {
        let mut values = vec![f64::NAN, 1.0, f64::NAN, f64::NAN, 4.0, f64::NAN];
        interpolate_linear(&mut values);
        assert!(values[0].is_nan());
        assert_eq!(&values[1..], &[1.0, 2.0, 3.0, 4.0, 4.0]);
    }

    #[test]
    fn test_gap_interpolated_then_mean_aggregated() {
        // 20 Hz source with the 100 ms sample missing, resampled to 10 Hz
        let group = group_at(&[Some(0), Some(50), Some(150), Some(200)], &[0.0, 1.0, 3.0, 4.0]);
        let (resampled, stats) = resample_group(&group, 50, 100);

        assert_eq!(stats.gaps_filled, 1);
        let times: Vec<Option<i64>> = resampled.records.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![Some(0), Some(100), Some(200)]);

        // Slot at 100 ms interpolates to 2.0
        let acc_x: Vec<f64> = resampled.records.iter().map(|r| r.acc[0]).collect();
        assert_close(acc_x[0], 0.5);
        assert_close(acc_x[1], 2.5);
        assert_close(acc_x[2], 4.0);
        assert_close(resampled.records[1].acc[1], 5.0);
        assert_close(resampled.records[1].acc[2], -2.5);
    }

    #[test]
    fn test_duplicates_keep_first() {
        let group = group_at(&[Some(0), Some(10), Some(52), Some(100)], &[1.0, 9.0, 2.0, 3.0]);
        let (resampled, stats) = resample_group(&group, 50, 50);

        assert_eq!(stats.duplicates, 1);
        let acc_x: Vec<f64> = resampled.records.iter().map(|r| r.acc[0]).collect();
        assert_eq!(acc_x, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_invalid_times_dropped() {
        let group = group_at(&[Some(0), None, Some(50)], &[1.0, 100.0, 2.0]);
        let (resampled, stats) = resample_group(&group, 50, 50);
        assert_eq!(stats.invalid_time, 1);
        assert_eq!(resampled.len(), 2);
        assert!(resampled.records.iter().all(|r| r.acc[0] < 100.0));
    }

    #[test]
    fn test_out_of_range_times_are_invalid() {
        let group = group_at(
            &[Some(0), Some(i64::MAX - 1), Some(50), Some(i64::MIN)],
            &[1.0, 7.0, 2.0, 7.0],
        );
        let (resampled, stats) = resample_group(&group, 50, 100);
        assert_eq!(stats.invalid_time, 2);
        assert_eq!(resampled.len(), 1);
        assert_eq!(resampled.records[0].acc[0], 1.5);
    }

    #[test]
    fn test_all_invalid_yields_empty_group() {
        let group = group_at(&[None, None], &[1.0, 2.0]);
        let (resampled, stats) = resample_group(&group, 50, 100);
        assert!(resampled.is_empty());
        assert_eq!(stats.invalid_time, 2);
    }

    #[test]
    fn test_single_timestamp_yields_one_record() {
        let group = group_at(&[Some(1_000), Some(1_010)], &[1.0, 2.0]);
        let (resampled, _) = resample_group(&group, 50, 100);
        assert_eq!(resampled.len(), 1);
        assert_eq!(resampled.records[0].time, Some(1_000));
        assert_eq!(resampled.records[0].acc[0], 1.0);
    }

    #[test]
    fn test_resampling_at_own_rate_is_noop() {
        let base = 1_620_000_000_000_i64;
        let times: Vec<Option<i64>> = (0..20).map(|i| Some(base + i * 100)).collect();
        let values: Vec<f64> = (0..20).map(|i| (i as f64).sin()).collect();
        let group = group_at(&times, &values);

        let (once, _) = resample_group(&group, 100, 100);
        let (twice, _) = resample_group(&once, 100, 100);

        assert_eq!(once.len(), group.len());
        for ((a, b), original) in once.records.iter().zip(&twice.records).zip(&group.records) {
            assert_eq!(a.time, b.time);
            assert_eq!(a.time, original.time);
            assert_close(a.acc[0], b.acc[0]);
            assert_close(a.acc[0], original.acc[0]);
        }
    }

    #[test]
    fn test_identity_always_present() {
        let group = group_at(&[Some(0), Some(400)], &[0.0, 8.0]);
        let (resampled, _) = resample_group(&group, 50, 100);
        assert_eq!(resampled.len(), 5);
        assert!(resampled.records.iter().all(|r| r.key() == group.key));
    }

    #[test]
    fn test_upsampling_leaves_empty_buckets_nan() {
        let group = group_at(&[Some(0), Some(100)], &[0.0, 1.0]);
        let (resampled, _) = resample_group(&group, 100, 50);
        assert_eq!(resampled.len(), 3);
        assert_eq!(resampled.records[0].acc[0], 0.0);
        assert!(resampled.records[1].acc[0].is_nan());
        assert_eq!(resampled.records[2].acc[0], 1.0);
    }

    #[test]
    fn test_extra_columns_resampled() {
        let key = GroupKey::new(1, "walk");
        let mut a = Record::new(Some(0), &key, [0.0; 3], [0.0; 3]);
        a.extra.insert("hr".to_string(), 60.0);
        a.text.insert("note".to_string(), "x".to_string());
        let mut b = Record::new(Some(100), &key, [0.0; 3], [0.0; 3]);
        b.extra.insert("hr".to_string(), 70.0);
        let group = Group::new(key, vec![a, b]);

        let (resampled, _) = resample_group(&group, 50, 50);
        let hr: Vec<f64> = resampled.records.iter().map(|r| r.extra["hr"]).collect();
        assert_eq!(hr, vec![60.0, 65.0, 70.0]);
        assert!(resampled.records.iter().all(|r| r.text.is_empty()));
    }
}
