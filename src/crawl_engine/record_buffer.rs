//! Accumulation buffer for one crawl
//!
//! Owned by a single orchestrator. Records are appended page by page in
//! fetch order; duplicates are left in place until export.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBuffer {
    records: Vec<String>,
}

impl RecordBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page's records, preserving their order
    pub fn extend<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.records.extend(records);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    #[must_use]
    pub fn records(&self) -> &[String] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<String>> for RecordBuffer {
    fn from(records: Vec<String>) -> Self {
        Self { records }
    }
}
