//! In-memory record store for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{RecordFilter, RecordStore};
use crate::types::record::{AuctionRecord, IdentityKey};

/// In-memory store with optimistic versioning.
///
/// Useful for testing and development. Not suitable for production as
/// data is lost on restart.
pub struct MemoryStore {
    records: RwLock<HashMap<IdentityKey, AuctionRecord>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Clear all stored records.
    pub fn clear(&self) {
        self.records.write().unwrap().clear();
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &IdentityKey) -> StoreResult<Option<AuctionRecord>> {
        Ok(self.records.read().unwrap().get(key).cloned())
    }

    async fn upsert(&self, mut record: AuctionRecord) -> StoreResult<AuctionRecord> {
        let mut records = self.records.write().unwrap();

        let stored_version = records.get(&record.key).map(|r| r.version).unwrap_or(0);
        if record.version != stored_version {
            return Err(StoreError::Conflict {
                key: record.key.to_string(),
            });
        }

        record.version += 1;
        records.insert(record.key.clone(), record.clone());
        Ok(record)
    }

    async fn query(&self, filter: &RecordFilter) -> StoreResult<Vec<AuctionRecord>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }
}
