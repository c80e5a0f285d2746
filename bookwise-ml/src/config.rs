//! Configuration for dataset preparation.
//!
//! Uses `figment` for layered configuration: defaults -> workspace file ->
//! environment -> explicit overrides. The workspace file lives at
//! `.bookwise/config.toml`. Every lookup table the feature rules use is part of
//! this configuration rather than a constant in the extractor.

use crate::error::PrepError;
use crate::features::mapping::{CalendarUpdatedTable, CategoryMapping};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level preparation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepConfig {
    /// Booking-score label derivation.
    #[serde(default)]
    pub labels: LabelConfig,
    /// Listing feature extraction.
    #[serde(default)]
    pub features: FeatureConfig,
    /// Final dataset assembly.
    #[serde(default)]
    pub dataset: DatasetConfig,
}

/// How snapshot A's ratio window is placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAlignment {
    /// Each snapshot's window starts at its own earliest date.
    #[default]
    Independent,
    /// Snapshot A is measured over snapshot B's window.
    SharedWithB,
}

/// Booking-score label configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Window length in days after the earliest snapshot date (inclusive).
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default)]
    pub alignment: WindowAlignment,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            alignment: WindowAlignment::Independent,
        }
    }
}

fn default_window_days() -> u32 {
    30
}

/// A date column turned into a day count relative to the reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFeature {
    pub column: String,
    pub output: String,
}

/// Listing feature extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Listing id column, kept as the row key.
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Identifier, free-text, media, scrape-metadata and redundant columns.
    #[serde(default = "default_dropped_columns")]
    pub dropped_columns: Vec<String>,
    /// Boolean-like tokens replaced in every column.
    #[serde(default = "default_flag_tokens")]
    pub flag_tokens: BTreeMap<String, i64>,
    #[serde(default = "CategoryMapping::host_response_time")]
    pub response_time: CategoryMapping,
    #[serde(default = "default_response_rate_column")]
    pub response_rate_column: String,
    /// Columns holding amounts like `$1,234.00`.
    #[serde(default = "default_currency_columns")]
    pub currency_columns: Vec<String>,
    /// Currency columns where a missing amount means zero.
    #[serde(default = "default_zero_default_columns")]
    pub zero_default_columns: Vec<String>,
    #[serde(default = "default_calendar_updated_column")]
    pub calendar_updated_column: String,
    #[serde(default)]
    pub calendar_updated: CalendarUpdatedTable,
    #[serde(default = "default_date_features")]
    pub date_features: Vec<DateFeature>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            id_column: default_id_column(),
            dropped_columns: default_dropped_columns(),
            flag_tokens: default_flag_tokens(),
            response_time: CategoryMapping::host_response_time(),
            response_rate_column: default_response_rate_column(),
            currency_columns: default_currency_columns(),
            zero_default_columns: default_zero_default_columns(),
            calendar_updated_column: default_calendar_updated_column(),
            calendar_updated: CalendarUpdatedTable::default(),
            date_features: default_date_features(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_dropped_columns() -> Vec<String> {
    strings(&[
        // urls, free text and media
        "listing_url",
        "name",
        "summary",
        "space",
        "description",
        "neighborhood_overview",
        "notes",
        "transit",
        "access",
        "interaction",
        "house_rules",
        "thumbnail_url",
        "medium_url",
        "picture_url",
        "xl_picture_url",
        // host identity
        "host_id",
        "host_url",
        "host_name",
        "host_location",
        "host_about",
        "host_thumbnail_url",
        "host_picture_url",
        "host_neighbourhood",
        "host_verifications",
        // scrape metadata
        "scrape_id",
        "last_scraped",
        "calendar_last_scraped",
        // leaky or duplicated host columns
        "host_acceptance_rate",
        "host_total_listings_count",
        // geography kept only at the cleansed neighbourhood level
        "neighbourhood_group_cleansed",
        "neighbourhood",
        "city",
        "state",
        "market",
        "smart_location",
        "country_code",
        "country",
        "street",
        "zipcode",
        // constant flags and raw text
        "has_availability",
        "experiences_offered",
        "amenities",
        "license",
    ])
}

fn default_flag_tokens() -> BTreeMap<String, i64> {
    BTreeMap::from([("f".to_string(), 0), ("t".to_string(), 1)])
}

fn default_response_rate_column() -> String {
    "host_response_rate".to_string()
}

fn default_currency_columns() -> Vec<String> {
    strings(&[
        "price",
        "weekly_price",
        "monthly_price",
        "security_deposit",
        "cleaning_fee",
        "extra_people",
    ])
}

fn default_zero_default_columns() -> Vec<String> {
    strings(&["security_deposit", "cleaning_fee", "extra_people"])
}

fn default_calendar_updated_column() -> String {
    "calendar_updated".to_string()
}

fn default_date_features() -> Vec<DateFeature> {
    [
        ("host_since", "days_as_host"),
        ("first_review", "days_since_first_review"),
        ("last_review", "days_since_last_review"),
    ]
    .into_iter()
    .map(|(column, output)| DateFeature {
        column: column.to_string(),
        output: output.to_string(),
    })
    .collect()
}

/// Dataset assembly configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Name of the key column in the assembled table.
    #[serde(default = "default_key_column")]
    pub key_column: String,
    /// Feature columns removed before the join because the label already consumed them.
    #[serde(default = "default_leakage_columns")]
    pub leakage_columns: Vec<String>,
    /// Minimum quality score (0.0-1.0) the assembled table should reach.
    #[serde(default = "default_quality_threshold")]
    pub quality_gate_threshold: f64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            key_column: default_key_column(),
            leakage_columns: default_leakage_columns(),
            quality_gate_threshold: default_quality_threshold(),
        }
    }
}

fn default_key_column() -> String {
    "id".to_string()
}

fn default_leakage_columns() -> Vec<String> {
    strings(&[
        "availability_30",
        "availability_60",
        "availability_90",
        "availability_365",
    ])
}

fn default_quality_threshold() -> f64 {
    0.5
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `BOOKWISE_`)
/// 3. Workspace config (`.bookwise/config.toml`)
/// 4. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&PrepConfig>,
) -> Result<PrepConfig, PrepError> {
    let mut figment = Figment::from(Serialized::defaults(PrepConfig::default()));

    if let Some(ws) = workspace {
        let ws_config = ws.join(".bookwise").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // BOOKWISE_LABELS__WINDOW_DAYS, BOOKWISE_LABELS__ALIGNMENT, ...
    figment = figment.merge(Env::prefixed("BOOKWISE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract().map_err(Box::new)?)
}
