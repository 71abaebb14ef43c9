//! Document and field extraction.

pub mod document;
pub mod fields;
pub mod patterns;

pub use document::DocumentExtractor;
pub use fields::{ExtractedFieldSet, FieldExtractor};
