//! Data quality checks for prepared tables.

use crate::data::schema::infer_schema;
use crate::data::source::DataBatch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A data quality report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_rows: usize,
    pub total_columns: usize,
    /// Percentage of null cells per column (0-100).
    pub null_percentage: BTreeMap<String, f64>,
    /// Columns that still hold text a model cannot consume directly.
    pub non_numeric_columns: Vec<String>,
    /// Rows whose key repeats an earlier row's key.
    pub duplicate_keys: usize,
    pub overall_score: f64,
    pub passed_gate: bool,
}

/// Validate a table keyed by `key_column` and produce a quality report.
pub fn validate_batch(batch: &DataBatch, key_column: &str, quality_threshold: f64) -> DataQualityReport {
    let total_rows = batch.rows.len();
    let total_columns = batch.columns.len();

    let mut null_percentage = BTreeMap::new();
    for (i, col) in batch.columns.iter().enumerate() {
        let nulls = batch
            .rows
            .iter()
            .filter(|row| row.get(i).is_none_or(|v| v.is_null()))
            .count();
        let pct = if total_rows > 0 {
            nulls as f64 / total_rows as f64 * 100.0
        } else {
            0.0
        };
        null_percentage.insert(col.clone(), pct);
    }

    let non_numeric_columns: Vec<String> = infer_schema(batch)
        .columns
        .into_iter()
        .filter(|c| !c.dtype.is_numeric())
        .map(|c| c.name)
        .collect();

    let mut duplicate_keys = 0;
    if let Some(idx) = batch.column_index(key_column) {
        let mut seen = HashSet::new();
        for row in &batch.rows {
            let key = row.get(idx).map(|v| v.to_string()).unwrap_or_default();
            if !seen.insert(key) {
                duplicate_keys += 1;
            }
        }
    }

    let avg_null = if null_percentage.is_empty() {
        0.0
    } else {
        null_percentage.values().sum::<f64>() / null_percentage.len() as f64
    };
    let dup_penalty = if total_rows > 0 {
        duplicate_keys as f64 / total_rows as f64
    } else {
        0.0
    };
    let text_penalty = if total_columns > 0 {
        non_numeric_columns.len() as f64 / total_columns as f64
    } else {
        0.0
    };
    let overall_score = (1.0 - avg_null / 100.0 - dup_penalty - text_penalty).clamp(0.0, 1.0);

    DataQualityReport {
        total_rows,
        total_columns,
        null_percentage,
        non_numeric_columns,
        duplicate_keys,
        overall_score,
        passed_gate: overall_score >= quality_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_validate_clean_table() {
        let batch = DataBatch::new(
            vec!["id".into(), "booking_score".into()],
            vec![vec![json!(1), json!(0.5)], vec![json!(2), json!(0.1)]],
        );
        let report = validate_batch(&batch, "id", 0.7);
        assert!(report.passed_gate);
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.duplicate_keys, 0);
        assert!(report.non_numeric_columns.is_empty());
        assert_eq!(report.overall_score, 1.0);
    }

    #[test]
    fn test_validate_flags_nulls_text_and_duplicates() {
        let batch = DataBatch::new(
            vec!["id".into(), "room_type".into()],
            vec![
                vec![json!(1), json!("Private room")],
                vec![json!(1), Value::Null],
            ],
        );
        let report = validate_batch(&batch, "id", 0.7);
        assert_eq!(report.duplicate_keys, 1);
        assert_eq!(report.null_percentage["room_type"], 50.0);
        assert_eq!(report.non_numeric_columns, vec!["room_type"]);
        assert!(!report.passed_gate);
    }
}
