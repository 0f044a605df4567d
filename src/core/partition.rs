//! Partitioning of records into (subject, activity) groups.

use crate::core::record::{GroupKey, Record};
use std::collections::BTreeMap;

/// All records sharing one (subject, activity) pair, in dataset order.
#[derive(Debug, Clone)]
pub struct Group {
    pub key: GroupKey,
    pub records: Vec<Record>,
}

impl Group {
    pub fn new(key: GroupKey, records: Vec<Record>) -> Self {
        Self { key, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest valid time in the group.
    pub fn time_span(&self) -> Option<(i64, i64)> {
        let mut times = self.records.iter().filter_map(|r| r.time);
        let first = times.next()?;
        Some(times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }
}

/// Split records into groups ordered by key.
///
/// Every record lands in exactly one group and keeps its relative order.
pub fn partition(records: Vec<Record>) -> Vec<Group> {
    let mut groups: BTreeMap<GroupKey, Vec<Record>> = BTreeMap::new();
    for record in records {
        groups.entry(record.key()).or_default().push(record);
    }
    groups
        .into_iter()
        .map(|(key, records)| Group::new(key, records))
        .collect()
}
