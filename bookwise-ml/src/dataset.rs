//! Training dataset assembly: booking scores left-joined with listing features.

use crate::config::{DatasetConfig, PrepConfig};
use crate::data::schema::float_value;
use crate::data::source::{DataBatch, DataSource};
use crate::data::transform::{TransformPipeline, TransformStep};
use crate::data::validate::{DataQualityReport, validate_batch};
use crate::error::PrepError;
use crate::features::{FeatureTable, extract_features_from};
use crate::labels::{BookingScoreTable, derive_booking_score_from};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

/// Name of the label column in the training table.
pub const LABEL_COLUMN: &str = "booking_score";

/// One row per scored listing: key, `booking_score`, then feature columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingTable {
    pub batch: DataBatch,
    pub key_column: String,
}

impl TrainingTable {
    pub fn len(&self) -> usize {
        self.batch.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.batch.columns
    }

    fn row_for(&self, id: i64) -> Option<&Vec<Value>> {
        self.batch
            .rows
            .iter()
            .find(|row| row.first().and_then(Value::as_i64) == Some(id))
    }

    pub fn ids(&self) -> Vec<i64> {
        self.batch
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_i64))
            .collect()
    }

    /// Cell for listing `id` in `column`.
    pub fn value(&self, id: i64, column: &str) -> Option<&Value> {
        let idx = self.batch.column_index(column)?;
        self.row_for(id)?.get(idx)
    }

    pub fn booking_score(&self, id: i64) -> Option<f64> {
        self.value(id, LABEL_COLUMN).and_then(Value::as_f64)
    }

    pub fn quality_report(&self, quality_threshold: f64) -> DataQualityReport {
        validate_batch(&self.batch, &self.key_column, quality_threshold)
    }

    /// Write the table as CSV with a header row; nulls become empty cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PrepError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.batch.columns)?;
        for row in &self.batch.rows {
            writer.write_record(row.iter().map(|v| match v {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Left-join booking scores onto listing features.
///
/// Every scored listing yields a row; feature cells are null when the listing
/// is missing from the feature table. Leakage columns are dropped first.
pub fn assemble(
    scores: &BookingScoreTable,
    features: &FeatureTable,
    config: &DatasetConfig,
) -> Result<TrainingTable, PrepError> {
    let feature_batch = TransformPipeline::new()
        .add_step(TransformStep::DropColumns {
            columns: config.leakage_columns.clone(),
        })
        .apply(features.batch.clone())?;

    let feature_columns: Vec<usize> = (0..feature_batch.columns.len())
        .filter(|&i| feature_batch.columns[i] != features.id_column)
        .collect();

    let mut columns = vec![config.key_column.clone(), LABEL_COLUMN.to_string()];
    columns.extend(feature_columns.iter().map(|&i| feature_batch.columns[i].clone()));

    let index = features.index_by_id();
    let mut unmatched = 0usize;
    let rows: Vec<Vec<Value>> = scores
        .iter()
        .map(|record| {
            let mut row = Vec::with_capacity(columns.len());
            row.push(Value::from(record.listing_id));
            row.push(float_value(record.booking_score));
            match index.get(&record.listing_id) {
                Some(&pos) => {
                    let source = &feature_batch.rows[pos];
                    row.extend(
                        feature_columns
                            .iter()
                            .map(|&i| source.get(i).cloned().unwrap_or(Value::Null)),
                    );
                }
                None => {
                    unmatched += 1;
                    row.resize(columns.len(), Value::Null);
                }
            }
            row
        })
        .collect();

    tracing::info!(
        rows = rows.len(),
        features = feature_columns.len(),
        without_features = unmatched,
        "Assembled training table"
    );
    Ok(TrainingTable {
        batch: DataBatch::new(columns, rows),
        key_column: config.key_column.clone(),
    })
}

/// Build the training table from the two calendar snapshots and the listings snapshot.
///
/// `reference_date` anchors the day-count features and defaults to today.
pub async fn build_dataset(
    snapshot_b: &dyn DataSource,
    snapshot_a: &dyn DataSource,
    listings: &dyn DataSource,
    reference_date: Option<NaiveDate>,
    config: &PrepConfig,
) -> Result<TrainingTable, PrepError> {
    let reference_date = reference_date.unwrap_or_else(|| chrono::Local::now().date_naive());

    let scores = derive_booking_score_from(snapshot_b, snapshot_a, &config.labels).await?;
    let features = extract_features_from(listings, reference_date, &config.features).await?;
    let table = assemble(&scores, &features, &config.dataset)?;

    let report = table.quality_report(config.dataset.quality_gate_threshold);
    if report.passed_gate {
        tracing::info!(score = report.overall_score, "Training table passed quality gate");
    } else {
        tracing::warn!(
            score = report.overall_score,
            threshold = config.dataset.quality_gate_threshold,
            non_numeric = ?report.non_numeric_columns,
            "Training table below quality gate"
        );
    }
    Ok(table)
}
