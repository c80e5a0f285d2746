//! Schema definition, type inference and numeric coercion for tables.

use crate::data::source::DataBatch;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Unknown,
}

impl ColumnType {
    /// Whether a model can consume the column without further encoding.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Boolean | Self::Null)
    }
}

/// Schema definition for a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub columns: Vec<ColumnSchema>,
}

/// Schema for a single column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
    pub nullable: bool,
}

/// Infer column type from a sample of values.
pub fn infer_column_type(values: &[Value]) -> ColumnType {
    let non_null: Vec<_> = values.iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return ColumnType::Null;
    }

    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_string = false;

    for v in &non_null {
        match v {
            Value::Number(n) => {
                if n.is_f64() {
                    has_float = true;
                } else {
                    has_int = true;
                }
            }
            Value::Bool(_) => has_bool = true,
            Value::String(_) => has_string = true,
            _ => {}
        }
    }

    if has_string {
        return ColumnType::String;
    }
    if has_float {
        return ColumnType::Float;
    }
    if has_int {
        return ColumnType::Integer;
    }
    if has_bool {
        return ColumnType::Boolean;
    }
    ColumnType::Unknown
}

/// Infer schema from a table.
pub fn infer_schema(batch: &DataBatch) -> SchemaDefinition {
    let columns = batch
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let values: Vec<Value> = batch
                .rows
                .iter()
                .filter_map(|row| row.get(i).cloned())
                .collect();
            ColumnSchema {
                name: name.clone(),
                dtype: infer_column_type(&values),
                nullable: values.iter().any(Value::is_null),
            }
        })
        .collect();

    SchemaDefinition { columns }
}

/// Convert text columns whose every non-null cell is numeric into numbers.
///
/// Integers are kept when every cell parses as `i64`, otherwise floats are
/// used. A single non-numeric cell keeps the whole column as text.
pub fn coerce_numeric_columns(batch: &mut DataBatch) {
    for idx in 0..batch.columns.len() {
        let mut saw_value = false;
        let mut all_int = true;
        let mut all_float = true;
        for row in &batch.rows {
            let Some(Value::String(s)) = row.get(idx) else {
                continue;
            };
            saw_value = true;
            if s.parse::<i64>().is_err() {
                all_int = false;
            }
            if parse_finite(s).is_none() {
                all_float = false;
                break;
            }
        }
        if !saw_value || !all_float {
            continue;
        }

        for row in &mut batch.rows {
            let Some(cell) = row.get_mut(idx) else {
                continue;
            };
            let parsed = match cell {
                Value::String(s) if all_int => s.parse::<i64>().map(Value::from).ok(),
                Value::String(s) => parse_finite(s).map(float_value),
                _ => continue,
            };
            *cell = parsed.unwrap_or(Value::Null);
        }
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// JSON number for a float; NaN and infinities become null.
pub fn float_value(f: f64) -> Value {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Read a cell as an integer id, accepting integral numbers and numeric text.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_column_type_int() {
        let values = vec![json!(1), json!(2), json!(3)];
        assert_eq!(infer_column_type(&values), ColumnType::Integer);
    }

    #[test]
    fn test_infer_column_type_string() {
        let values = vec![json!("a"), json!("b")];
        assert_eq!(infer_column_type(&values), ColumnType::String);
    }

    #[test]
    fn test_infer_schema() {
        let batch = DataBatch::new(
            vec!["room_type".to_string(), "accommodates".to_string()],
            vec![
                vec![json!("Private room"), json!(2)],
                vec![json!("Entire home/apt"), Value::Null],
            ],
        );
        let schema = infer_schema(&batch);
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[0].dtype, ColumnType::String);
        assert_eq!(schema.columns[1].dtype, ColumnType::Integer);
        assert!(schema.columns[1].nullable);
    }

    #[test]
    fn test_coerce_numeric_columns() {
        let mut batch = DataBatch::new(
            vec!["id".into(), "bathrooms".into(), "price".into()],
            vec![
                vec![json!("12"), json!("1.5"), json!("$85.00")],
                vec![json!("13"), Value::Null, json!("$90.00")],
            ],
        );
        coerce_numeric_columns(&mut batch);
        assert_eq!(batch.rows[0], vec![json!(12), json!(1.5), json!("$85.00")]);
        assert_eq!(batch.rows[1][1], Value::Null);
    }

    #[test]
    fn test_coerce_leaves_nan_text_alone() {
        let mut batch = DataBatch::new(vec!["x".into()], vec![vec![json!("NaN")]]);
        coerce_numeric_columns(&mut batch);
        assert_eq!(batch.rows[0][0], json!("NaN"));
    }

    #[test]
    fn test_value_as_i64() {
        assert_eq!(value_as_i64(&json!(42)), Some(42));
        assert_eq!(value_as_i64(&json!(42.0)), Some(42));
        assert_eq!(value_as_i64(&json!(" 7 ")), Some(7));
        assert_eq!(value_as_i64(&json!(4.5)), None);
        assert_eq!(value_as_i64(&Value::Null), None);
    }

    #[test]
    fn test_float_value_nan_is_null() {
        assert_eq!(float_value(f64::NAN), Value::Null);
        assert_eq!(float_value(0.5), json!(0.5));
    }
}
