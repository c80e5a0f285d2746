//! # bookwise-ml: booking-score dataset preparation
//!
//! Turns three scraped Airbnb snapshots into a supervised training table:
//! two calendar pulls (A earlier, B later) give a per-listing booking score,
//! and the listings pull gives the features it is joined with.
//!
//! ## Stages
//!
//! 1. **Labels**: unavailable-day ratios per snapshot, then `ratio_b - ratio_a`
//! 2. **Features**: column drops, flag and category encoding, amount and date parsing
//! 3. **Dataset**: left join of scores onto features, keyed by listing id

// Foundation
pub mod config;
pub mod error;

// Loading, transforms and lineage
pub mod data;

// Pipeline stages
pub mod dataset;
pub mod features;
pub mod labels;

// Re-exports
pub use config::{DatasetConfig, FeatureConfig, LabelConfig, PrepConfig, WindowAlignment, load_config};
pub use data::{DataBatch, DataSource, source_for_location};
pub use dataset::{TrainingTable, assemble, build_dataset};
pub use error::PrepError;
pub use features::{FeatureTable, extract_features};
pub use labels::{BookingScoreTable, derive_booking_score};
