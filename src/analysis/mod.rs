//! Market comparison and opportunity scoring.

pub mod comparator;
pub mod dvf;
pub mod scorer;

pub use comparator::MarketComparator;
pub use dvf::DvfClient;
pub use scorer::OpportunityScorer;
