//! Category-to-number lookup tables.
//!
//! The tables are plain serde values so they can be overridden from
//! configuration and tested on their own.

use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// What to do with a category that has no entry in a [`CategoryMapping`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPolicy {
    /// Leave the raw value in place.
    #[default]
    Keep,
    /// Replace the raw value with null.
    Null,
}

/// Lookup table from categorical text to a number for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMapping {
    pub column: String,
    pub values: BTreeMap<String, i64>,
    #[serde(default)]
    pub unmapped: UnmappedPolicy,
}

impl CategoryMapping {
    /// `host_response_time` buckets, roughly the hours a host takes to answer.
    pub fn host_response_time() -> Self {
        let values = [
            ("within an hour", 1),
            ("within a few hours", 5),
            ("within a day", 20),
            ("a few days or more", 100),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            column: "host_response_time".to_string(),
            values,
            unmapped: UnmappedPolicy::Keep,
        }
    }

    pub fn lookup(&self, category: &str) -> Option<i64> {
        self.values.get(category).copied()
    }

    /// Map one cell. Returns the new value and whether the cell was an unmapped category.
    pub fn apply(&self, cell: &Value) -> (Value, bool) {
        match cell {
            Value::String(s) => match self.lookup(s) {
                Some(n) => (Value::from(n), false),
                None => match self.unmapped {
                    UnmappedPolicy::Keep => (cell.clone(), true),
                    UnmappedPolicy::Null => (Value::Null, true),
                },
            },
            other => (other.clone(), false),
        }
    }
}

/// Maps `calendar_updated` phrases ("3 weeks ago", "today", ...) to a day count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarUpdatedTable {
    /// Suffix removed before lookup.
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Leading article removed before lookup ("a week ago").
    #[serde(default = "default_article")]
    pub article: String,
    /// Whole phrases with a fixed day count.
    pub keywords: BTreeMap<String, i64>,
    /// Days per unit for "<N> <unit>" phrases.
    pub units: BTreeMap<String, i64>,
}

fn default_suffix() -> String {
    " ago".to_string()
}

fn default_article() -> String {
    "a ".to_string()
}

impl Default for CalendarUpdatedTable {
    fn default() -> Self {
        let keywords = [("never", 3650), ("today", 0), ("yesterday", 1), ("week", 7)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let units = [
            ("weeks", 7),
            ("week", 7),
            ("months", 30),
            ("month", 30),
            ("days", 1),
            ("day", 1),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            suffix: default_suffix(),
            article: default_article(),
            keywords,
            units,
        }
    }
}

impl CalendarUpdatedTable {
    /// Number of days a `calendar_updated` phrase stands for.
    pub fn days(&self, raw: &str) -> Result<i64, PrepError> {
        let trimmed = raw.trim();
        let phrase = trimmed.strip_suffix(self.suffix.as_str()).unwrap_or(trimmed);
        let phrase = phrase.strip_prefix(self.article.as_str()).unwrap_or(phrase);

        if let Some(days) = self.keywords.get(phrase) {
            return Ok(*days);
        }

        let unexpected =
            || PrepError::data_format(format!("unexpected calendar_updated value '{raw}'"));
        let (count, unit) = phrase.split_once(' ').ok_or_else(unexpected)?;
        let count: i64 = count.parse().map_err(|_| unexpected())?;
        let per_unit = self.units.get(unit).ok_or_else(unexpected)?;
        Ok(count * per_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_response_time_lookup() {
        let mapping = CategoryMapping::host_response_time();
        assert_eq!(mapping.lookup("within an hour"), Some(1));
        assert_eq!(mapping.lookup("within a few hours"), Some(5));
        assert_eq!(mapping.lookup("within a day"), Some(20));
        assert_eq!(mapping.lookup("a few days or more"), Some(100));
        assert_eq!(mapping.lookup("N/A"), None);
    }

    #[test]
    fn test_unmapped_category_kept() {
        let mapping = CategoryMapping::host_response_time();
        let (value, unmapped) = mapping.apply(&json!("N/A"));
        assert_eq!(value, json!("N/A"));
        assert!(unmapped);

        let (value, unmapped) = mapping.apply(&Value::Null);
        assert_eq!(value, Value::Null);
        assert!(!unmapped);
    }

    #[test]
    fn test_unmapped_category_nulled() {
        let mapping = CategoryMapping {
            unmapped: UnmappedPolicy::Null,
            ..CategoryMapping::host_response_time()
        };
        assert_eq!(mapping.apply(&json!("N/A")).0, Value::Null);
        assert_eq!(mapping.apply(&json!("within a day")).0, json!(20));
    }

    #[test]
    fn test_calendar_updated_keywords() {
        let table = CalendarUpdatedTable::default();
        assert_eq!(table.days("today").unwrap(), 0);
        assert_eq!(table.days("yesterday").unwrap(), 1);
        assert_eq!(table.days("never").unwrap(), 3650);
        assert_eq!(table.days("a week ago").unwrap(), 7);
        assert_eq!(table.days("week").unwrap(), 7);
    }

    #[test]
    fn test_calendar_updated_counted_units() {
        let table = CalendarUpdatedTable::default();
        assert_eq!(table.days("3 weeks ago").unwrap(), 21);
        assert_eq!(table.days("2 months ago").unwrap(), 60);
        assert_eq!(table.days("4 days ago").unwrap(), 4);
        assert_eq!(table.days("1 week ago").unwrap(), 7);
    }

    #[test]
    fn test_calendar_updated_rejects_unknown() {
        let table = CalendarUpdatedTable::default();
        assert!(matches!(
            table.days("3 fortnights ago"),
            Err(PrepError::DataFormat(_))
        ));
        assert!(table.days("sometime").is_err());
        assert!(table.days("many weeks ago").is_err());
    }

    #[test]
    fn test_calendar_updated_table_from_toml() {
        let table: CalendarUpdatedTable = toml::from_str(
            r#"
keywords = { never = 999 }
units = { years = 365 }
"#,
        )
        .unwrap();
        assert_eq!(table.suffix, " ago");
        assert_eq!(table.days("never").unwrap(), 999);
        assert_eq!(table.days("2 years ago").unwrap(), 730);
    }
}
