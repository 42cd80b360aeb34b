// src/matcher/multiset.rs
use std::io::BufRead;
use std::path::Path;
use ahash::AHashMap;
use log::debug;

use crate::error::Result;
use crate::parser::{self, RecordKey};
use crate::types::StagingRecord;

/// Counted multiset of target lines keyed by their deduplication key.
#[derive(Debug, Clone, Default)]
pub struct TargetMultiset {
    entries: AHashMap<RecordKey, StagingRecord>,
    lines: usize,
    skipped: usize,
}

impl TargetMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a target file. `on_line` sees the 0-based index of every physical line.
    pub fn build<P, L>(path: P, skip_malformed: bool, on_line: L) -> Result<Self>
    where
        P: AsRef<Path>,
        L: FnMut(usize),
    {
        let path = path.as_ref();
        debug!("Creating target buffer for {:?}", path);
        let reader = parser::open_lines(path)?;
        Self::from_reader(reader, skip_malformed, on_line).map_err(|e| e.with_path(path))
    }

    pub fn from_reader<R, L>(reader: R, skip_malformed: bool, on_line: L) -> Result<Self>
    where
        R: BufRead,
        L: FnMut(usize),
    {
        let mut multiset = Self::new();
        let skipped = parser::for_each_record(reader, skip_malformed, on_line, |keyed| {
            multiset.insert(keyed.key, keyed.view.raw);
            Ok(())
        })?;
        multiset.skipped = skipped;
        Ok(multiset)
    }

    /// Add one copy of `raw`. The first line seen for a key becomes its representative.
    pub fn insert(&mut self, key: RecordKey, raw: &str) {
        self.lines += 1;
        self.entries
            .entry(key)
            .and_modify(|record| record.count += 1)
            .or_insert_with(|| StagingRecord {
                count: 1,
                raw: raw.to_string(),
            });
    }

    /// Take one copy for `key`. Returns false once no copies remain.
    pub fn consume(&mut self, key: &RecordKey) -> bool {
        match self.entries.get_mut(key) {
            Some(record) if record.count > 0 => {
                record.count -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self, key: &RecordKey) -> usize {
        self.entries.get(key).map_or(0, |record| record.count)
    }

    /// Snapshot of every record with copies left, ordered by raw text then key.
    pub fn leftovers(&self) -> Vec<StagingRecord> {
        let mut leftovers: Vec<(&RecordKey, &StagingRecord)> = self.entries
            .iter()
            .filter(|(_, record)| record.count > 0)
            .collect();
        leftovers.sort_by(|a, b| a.1.raw.cmp(&b.1.raw).then_with(|| a.0.cmp(b.0)));
        leftovers.into_iter().map(|(_, record)| record.clone()).collect()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies still available across all keys.
    pub fn total_count(&self) -> usize {
        self.entries.values().map(|record| record.count).sum()
    }

    /// Non-empty lines inserted.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Malformed lines dropped while building.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
