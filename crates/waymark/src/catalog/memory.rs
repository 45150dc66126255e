//! In-process catalog, for hosts that push records in directly and for tests.

use parking_lot::RwLock;

use super::{CATALOG_API_VERSION, CatalogSource, Record};
use crate::error::CatalogError;
use crate::types::RecordId;

/// A catalog held in memory
pub struct MemoryCatalog {
    records: RwLock<Vec<Record>>,
    api_version: u32,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryCatalog {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
            api_version: CATALOG_API_VERSION,
        }
    }

    /// Advertise a different interface version
    pub fn with_api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }

    /// Replace the whole catalog
    pub fn replace(&self, records: Vec<Record>) {
        *self.records.write() = records;
    }

    /// Insert a record, replacing any record with the same id
    pub fn upsert(&self, record: Record) {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Remove a record. Returns whether it existed.
    pub fn remove(&self, id: &RecordId) -> bool {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| &r.id != id);
        records.len() != before
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl CatalogSource for MemoryCatalog {
    fn api_version(&self) -> u32 {
        self.api_version
    }

    fn fetch_all(&self) -> Result<Vec<Record>, CatalogError> {
        Ok(self.records.read().clone())
    }
}
