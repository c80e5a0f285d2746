//! Listing feature extraction: lookup tables, field parsers and the extractor.

pub mod extractor;
pub mod mapping;
pub mod parse;

pub use extractor::{FeatureTable, extract_features, extract_features_from, feature_pipeline};
pub use mapping::{CalendarUpdatedTable, CategoryMapping, UnmappedPolicy};
