//! Record-store trait.
//!
//! The persisted store is an external collaborator behind a narrow
//! interface: version-checked upsert keyed by the stable identity key,
//! point get, and filtered query. Concurrent writers to the same key
//! serialize through the version check; the pipeline retries conflicts
//! with a fresh read-merge-write.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::types::record::{AuctionRecord, DocumentStatus, IdentityKey};

/// Store for canonical auction records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Get a record by identity key.
    async fn get(&self, key: &IdentityKey) -> StoreResult<Option<AuctionRecord>>;

    /// Atomic version-checked upsert.
    ///
    /// `record.version` must equal the stored record's version (or 0 when
    /// no record exists for the key); otherwise `StoreError::Conflict`.
    /// On success the stored copy is returned with its version bumped.
    async fn upsert(&self, record: AuctionRecord) -> StoreResult<AuctionRecord>;

    /// Records matching a filter.
    async fn query(&self, filter: &RecordFilter) -> StoreResult<Vec<AuctionRecord>>;

    /// All records.
    async fn list(&self) -> StoreResult<Vec<AuctionRecord>> {
        self.query(&RecordFilter::default()).await
    }

    /// Number of stored records.
    async fn count(&self) -> StoreResult<usize> {
        Ok(self.list().await?.len())
    }
}

/// Filter for record queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Only records in this department
    pub department: Option<String>,

    /// Only sales on or after this date
    pub min_sale_date: Option<NaiveDate>,

    /// Only sales on or before this date
    pub max_sale_date: Option<NaiveDate>,

    /// Only records with this document status
    pub document_status: Option<DocumentStatus>,

    /// Only records with (true) / without (false) a computed score
    pub scored: Option<bool>,
}

impl RecordFilter {
    /// A filter matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one department.
    pub fn for_department(department: impl Into<String>) -> Self {
        Self {
            department: Some(department.into()),
            ..Default::default()
        }
    }

    /// Restrict by document status.
    pub fn with_document_status(mut self, status: DocumentStatus) -> Self {
        self.document_status = Some(status);
        self
    }

    /// Restrict to unscored records.
    pub fn unscored(mut self) -> Self {
        self.scored = Some(false);
        self
    }

    /// Check whether a record matches.
    pub fn matches(&self, record: &AuctionRecord) -> bool {
        if let Some(department) = &self.department {
            if record.department.as_deref() != Some(department.as_str()) {
                return false;
            }
        }
        if let Some(min) = self.min_sale_date {
            match record.sale_date {
                Some(date) if date >= min => {}
                _ => return false,
            }
        }
        if let Some(max) = self.max_sale_date {
            match record.sale_date {
                Some(date) if date <= max => {}
                _ => return false,
            }
        }
        if let Some(status) = self.document_status {
            if record.document_status != status {
                return false;
            }
        }
        if let Some(scored) = self.scored {
            if record.is_scored() != scored {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_department_and_status() {
        let mut record = AuctionRecord::new(IdentityKey::from_hash("k"));
        record.department = Some("75".into());
        record.document_status = DocumentStatus::Pending;

        assert!(RecordFilter::for_department("75").matches(&record));
        assert!(!RecordFilter::for_department("92").matches(&record));
        assert!(RecordFilter::new()
            .with_document_status(DocumentStatus::Pending)
            .matches(&record));
        assert!(!RecordFilter::new()
            .with_document_status(DocumentStatus::Extracted)
            .matches(&record));
    }

    #[test]
    fn unscored_filter() {
        let mut record = AuctionRecord::new(IdentityKey::from_hash("k"));
        assert!(RecordFilter::new().unscored().matches(&record));
        record.opportunity_score = Some(50.0);
        assert!(!RecordFilter::new().unscored().matches(&record));
    }
}
