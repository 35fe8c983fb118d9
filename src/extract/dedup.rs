use crate::extract::record::Record;
use std::collections::{HashMap, HashSet};

/// Which occurrence of a duplicate survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupStrategy {
    /// Keep the first record seen; later copies are reported as duplicates
    #[default]
    First,
    /// Never skip while streaming; collect the last copy of each key instead
    Last,
}

/// In-stream duplicate filter over record content hashes
#[derive(Debug, Default)]
pub struct Deduplicator {
    key_fields: Option<Vec<String>>,
    strategy: DedupStrategy,
    seen: HashSet<String>,
    last_records: HashMap<String, (usize, Record)>,
    processed: u64,
    duplicates: u64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash only these fields instead of the whole record
    pub fn with_key_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.key_fields = if fields.is_empty() { None } else { Some(fields) };
        self
    }

    pub fn with_strategy(mut self, strategy: DedupStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn hash(&self, record: &Record) -> String {
        match &self.key_fields {
            Some(fields) => record.key_hash(fields),
            None => record.content_hash(),
        }
    }

    /// Registers `record` and reports whether the caller should drop it
    ///
    /// Under [`DedupStrategy::Last`] this always returns `false`; the
    /// survivors are read back with [`into_unique_records`](Self::into_unique_records).
    pub fn is_duplicate(&mut self, record: &Record) -> bool {
        self.processed += 1;
        let hash = self.hash(record);

        match self.strategy {
            DedupStrategy::First => {
                if self.seen.insert(hash) {
                    false
                } else {
                    self.duplicates += 1;
                    true
                }
            }
            DedupStrategy::Last => {
                let order = self.last_records.len();
                match self.last_records.get_mut(&hash) {
                    Some(slot) => {
                        self.duplicates += 1;
                        slot.1 = record.clone();
                    }
                    None => {
                        self.last_records.insert(hash, (order, record.clone()));
                    }
                }
                false
            }
        }
    }

    /// Filters `records`, keeping the survivors in input order
    pub fn filter(&mut self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().filter(|r| !self.is_duplicate(r)).collect()
    }

    /// Survivors collected under [`DedupStrategy::Last`], in first-seen key order
    pub fn into_unique_records(self) -> Vec<Record> {
        let mut kept: Vec<(usize, Record)> = self.last_records.into_values().collect();
        kept.sort_by_key(|(order, _)| *order);
        kept.into_iter().map(|(_, record)| record).collect()
    }

    pub fn processed_count(&self) -> u64 {
        self.processed
    }

    pub fn duplicate_count(&self) -> u64 {
        self.duplicates
    }

    pub fn reset(&mut self) {
        self.seen.clear();
        self.last_records.clear();
        self.processed = 0;
        self.duplicates = 0;
    }
}
