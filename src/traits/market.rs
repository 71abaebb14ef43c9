//! Market-data trait.

use async_trait::async_trait;

use crate::error::AnalysisError;
use crate::types::market::ComparableTransaction;
use crate::types::record::PropertyType;

/// Read-only access to historical transaction data (DVF).
///
/// The pipeline consumes this collaborator to retrieve comparables for a
/// district; implementations wrap the public DVF API, a local extract, or
/// a mock.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Transactions in a district within the look-back window, optionally
    /// restricted to a property type.
    async fn comparables(
        &self,
        district: &str,
        window_months: u32,
        property_type: Option<PropertyType>,
    ) -> Result<Vec<ComparableTransaction>, AnalysisError>;
}
