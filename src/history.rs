//! Run history
//!
//! Append-only collection of finished-run snapshots, kept for the lifetime of
//! the process. Records are never mutated; the only removal is an explicit
//! operator reset of the whole collection.

use serde::Serialize;

use crate::audit::summarize;
use crate::types::{GroupBy, HistoryRecord, SummaryRow};

/// In-memory history of finished runs
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryStore {
    records: Vec<HistoryRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished run
    pub fn append(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    /// All records, oldest first
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Grouped averages over every stored run
    pub fn summarize(&self, group_by: GroupBy) -> Vec<SummaryRow> {
        summarize(&self.records, group_by)
    }

    /// Export the records as JSON for display layers
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.records)
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
