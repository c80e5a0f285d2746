//! Listing feature extraction.

use crate::config::FeatureConfig;
use crate::data::lineage::DataLineage;
use crate::data::schema::{float_value, value_as_i64};
use crate::data::source::{DataBatch, DataSource};
use crate::data::transform::{TransformPipeline, TransformStep};
use crate::error::PrepError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Cleaned listing features, one row per input listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTable {
    pub batch: DataBatch,
    /// Column holding the listing id.
    pub id_column: String,
    pub lineage: DataLineage,
}

impl FeatureTable {
    pub fn row_count(&self) -> usize {
        self.batch.row_count()
    }

    /// Row position per listing id; the first row wins when an id repeats.
    pub fn index_by_id(&self) -> HashMap<i64, usize> {
        let mut index = HashMap::new();
        if let Some(idx) = self.batch.column_index(&self.id_column) {
            for (pos, row) in self.batch.rows.iter().enumerate() {
                if let Some(id) = row.get(idx).and_then(value_as_i64) {
                    index.entry(id).or_insert(pos);
                }
            }
        }
        index
    }
}

/// Build the transform pipeline for listings.
///
/// Steps run in this order: column drops, boolean flags, response time
/// categories, response rate, currency amounts with zero defaults,
/// `calendar_updated`, then date columns turned into day counts.
pub fn feature_pipeline(config: &FeatureConfig, reference_date: NaiveDate) -> TransformPipeline {
    let mut pipeline = TransformPipeline::new()
        .add_step(TransformStep::DropColumns {
            columns: config.dropped_columns.clone(),
        })
        .add_step(TransformStep::ReplaceTokens {
            tokens: config
                .flag_tokens
                .iter()
                .map(|(token, n)| (token.clone(), Value::from(*n)))
                .collect(),
        })
        .add_step(TransformStep::MapCategories {
            mapping: config.response_time.clone(),
        })
        .add_step(TransformStep::ParsePercent {
            column: config.response_rate_column.clone(),
        });

    for column in &config.currency_columns {
        pipeline = pipeline.add_step(TransformStep::ParseCurrency {
            column: column.clone(),
        });
    }
    for column in &config.zero_default_columns {
        pipeline = pipeline.add_step(TransformStep::FillNull {
            column: column.clone(),
            value: float_value(0.0),
        });
    }

    pipeline = pipeline.add_step(TransformStep::ParseCalendarUpdated {
        column: config.calendar_updated_column.clone(),
        table: config.calendar_updated.clone(),
    });

    for date in &config.date_features {
        pipeline = pipeline.add_step(TransformStep::DaysSince {
            column: date.column.clone(),
            output: date.output.clone(),
            reference: reference_date,
        });
    }
    pipeline.add_step(TransformStep::DropColumns {
        columns: config.date_features.iter().map(|d| d.column.clone()).collect(),
    })
}

/// Extract features from a loaded listings table.
pub fn extract_features(
    listings: &DataBatch,
    reference_date: NaiveDate,
    config: &FeatureConfig,
) -> Result<FeatureTable, PrepError> {
    let dataset_id = uuid::Uuid::new_v4().to_string();
    let lineage = DataLineage::new(&dataset_id, "memory", "listings");
    run_extraction(listings.clone(), reference_date, config, lineage)
}

/// Load listings from `source` and extract features.
pub async fn extract_features_from(
    source: &dyn DataSource,
    reference_date: NaiveDate,
    config: &FeatureConfig,
) -> Result<FeatureTable, PrepError> {
    let listings = source.load(None).await?;
    let lineage = DataLineage::for_source(&source.source_info());
    run_extraction(listings, reference_date, config, lineage)
}

fn run_extraction(
    listings: DataBatch,
    reference_date: NaiveDate,
    config: &FeatureConfig,
    mut lineage: DataLineage,
) -> Result<FeatureTable, PrepError> {
    tracing::info!(listings = listings.row_count(), "Extracting listing features");
    listings.require_column(&config.id_column)?;

    let rows_in = listings.row_count();
    let batch = feature_pipeline(config, reference_date).apply_with_lineage(listings, &mut lineage)?;
    debug_assert_eq!(batch.row_count(), rows_in);

    tracing::info!(
        listings = batch.row_count(),
        features = batch.column_count().saturating_sub(1),
        steps = lineage.transforms_applied.len(),
        "Extracted listing features"
    );
    Ok(FeatureTable {
        batch,
        id_column: config.id_column.clone(),
        lineage,
    })
}
