//! Data transformation pipeline.
//!
//! A pipeline is an immutable list of named steps. Each step consumes a
//! [`DataBatch`] and returns a new one; steps never filter rows.

use crate::data::lineage::DataLineage;
use crate::data::schema::float_value;
use crate::data::source::DataBatch;
use crate::error::PrepError;
use crate::features::mapping::{CalendarUpdatedTable, CategoryMapping};
use crate::features::parse::{parse_currency, parse_date, parse_percent};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A transformation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformStep {
    /// Remove columns; names not present are ignored.
    DropColumns { columns: Vec<String> },
    FillNull { column: String, value: Value },
    /// Replace text cells equal to a token, in every column.
    ReplaceTokens { tokens: BTreeMap<String, Value> },
    MapCategories { mapping: CategoryMapping },
    ParsePercent { column: String },
    ParseCurrency { column: String },
    ParseCalendarUpdated {
        column: String,
        table: CalendarUpdatedTable,
    },
    /// Add `output` holding whole days from the date in `column` to `reference`.
    DaysSince {
        column: String,
        output: String,
        reference: NaiveDate,
    },
}

impl TransformStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DropColumns { .. } => "drop_columns",
            Self::FillNull { .. } => "fill_null",
            Self::ReplaceTokens { .. } => "replace_tokens",
            Self::MapCategories { .. } => "map_categories",
            Self::ParsePercent { .. } => "parse_percent",
            Self::ParseCurrency { .. } => "parse_currency",
            Self::ParseCalendarUpdated { .. } => "parse_calendar_updated",
            Self::DaysSince { .. } => "days_since",
        }
    }
}

/// A pipeline of transformation steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformPipeline {
    pub steps: Vec<TransformStep>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add_step(mut self, step: TransformStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Apply the pipeline to a data batch.
    pub fn apply(&self, mut batch: DataBatch) -> Result<DataBatch, PrepError> {
        for step in &self.steps {
            batch = apply_step(batch, step)?;
        }
        Ok(batch)
    }

    /// Apply the pipeline, recording every step in `lineage`.
    pub fn apply_with_lineage(
        &self,
        mut batch: DataBatch,
        lineage: &mut DataLineage,
    ) -> Result<DataBatch, PrepError> {
        for step in &self.steps {
            let rows_before = batch.row_count();
            let columns_before = batch.column_count();
            batch = apply_step(batch, step)?;
            tracing::debug!(
                step = step.name(),
                columns_before,
                columns_after = batch.column_count(),
                "Applied transform"
            );
            lineage.add_transform(TransformRecord {
                step: step.clone(),
                applied_at: chrono::Utc::now(),
                rows_before,
                rows_after: batch.row_count(),
            });
        }
        Ok(batch)
    }
}

fn apply_step(mut batch: DataBatch, step: &TransformStep) -> Result<DataBatch, PrepError> {
    match step {
        TransformStep::DropColumns { columns } => {
            let dropped: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
            let keep: Vec<usize> = (0..batch.columns.len())
                .filter(|&i| !dropped.contains(batch.columns[i].as_str()))
                .collect();
            if keep.len() == batch.columns.len() {
                return Ok(batch);
            }
            let columns = keep.iter().map(|&i| batch.columns[i].clone()).collect();
            let rows = batch
                .rows
                .into_iter()
                .map(|row| {
                    keep.iter()
                        .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect();
            Ok(DataBatch::new(columns, rows))
        }
        TransformStep::FillNull { column, value } => {
            if let Some(idx) = batch.column_index(column) {
                for row in &mut batch.rows {
                    if let Some(cell) = row.get_mut(idx) {
                        if cell.is_null() {
                            *cell = value.clone();
                        }
                    }
                }
            }
            Ok(batch)
        }
        TransformStep::ReplaceTokens { tokens } => {
            for cell in batch.rows.iter_mut().flatten() {
                if let Value::String(s) = cell {
                    if let Some(replacement) = tokens.get(s.as_str()) {
                        *cell = replacement.clone();
                    }
                }
            }
            Ok(batch)
        }
        TransformStep::MapCategories { mapping } => {
            let idx = batch.require_column(&mapping.column)?;
            let mut unmapped = BTreeSet::new();
            for row in &mut batch.rows {
                if let Some(cell) = row.get_mut(idx) {
                    let (value, missed) = mapping.apply(cell);
                    if missed {
                        if let Value::String(s) = cell {
                            unmapped.insert(s.clone());
                        }
                    }
                    *cell = value;
                }
            }
            for category in &unmapped {
                tracing::warn!(
                    column = %mapping.column,
                    category = %category,
                    policy = ?mapping.unmapped,
                    "No mapping for category"
                );
            }
            Ok(batch)
        }
        TransformStep::ParsePercent { column } => {
            map_text_cells(batch, column, |s| parse_percent(s).map(float_value))
        }
        TransformStep::ParseCurrency { column } => {
            map_text_cells(batch, column, |s| parse_currency(s).map(float_value))
        }
        TransformStep::ParseCalendarUpdated { column, table } => {
            map_text_cells(batch, column, |s| table.days(s).map(Value::from))
        }
        TransformStep::DaysSince {
            column,
            output,
            reference,
        } => {
            let idx = batch.require_column(column)?;
            let mut days = Vec::with_capacity(batch.rows.len());
            for row in &batch.rows {
                let value = match row.get(idx) {
                    Some(Value::String(s)) => {
                        let date = parse_date(s).map_err(|e| e.in_column(column))?;
                        Value::from((*reference - date).num_days())
                    }
                    Some(Value::Null) | None => Value::Null,
                    Some(other) => {
                        return Err(PrepError::data_format(format!(
                            "column '{column}': expected a date, found {other}"
                        )));
                    }
                };
                days.push(value);
            }
            let out_idx = match batch.column_index(output) {
                Some(i) => i,
                None => {
                    batch.columns.push(output.clone());
                    batch.columns.len() - 1
                }
            };
            for (row, value) in batch.rows.iter_mut().zip(days) {
                if row.len() <= out_idx {
                    row.resize(out_idx + 1, Value::Null);
                }
                row[out_idx] = value;
            }
            Ok(batch)
        }
    }
}

/// Replace every text cell of `column` with `parse(text)`; numbers and nulls pass through.
fn map_text_cells<F>(mut batch: DataBatch, column: &str, parse: F) -> Result<DataBatch, PrepError>
where
    F: Fn(&str) -> Result<Value, PrepError>,
{
    let idx = batch.require_column(column)?;
    for row in &mut batch.rows {
        if let Some(cell) = row.get_mut(idx) {
            if let Value::String(s) = cell {
                *cell = parse(s).map_err(|e| e.in_column(column))?;
            }
        }
    }
    Ok(batch)
}

/// Record of a transform applied (for lineage tracking).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRecord {
    pub step: TransformStep,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub rows_before: usize,
    pub rows_after: usize,
}
