//! Data source abstraction for loading snapshot tables.
//!
//! Every input (calendar snapshots, listings snapshot) is a delimited table with a
//! header row, usually gzip-compressed, addressed by an opaque location string.
//! Only local files are read here; remote retrieval belongs to whoever implements
//! [`DataSource`] for that storage.

use crate::data::schema::coerce_numeric_columns;
use crate::error::PrepError;
use async_trait::async_trait;
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A table of rows loaded from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub total_rows: usize,
}

impl DataBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        let total_rows = rows.len();
        Self {
            columns,
            rows,
            total_rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of a column that must be present.
    pub fn require_column(&self, name: &str) -> Result<usize, PrepError> {
        self.column_index(name)
            .ok_or_else(|| PrepError::data_format(format!("missing required column '{name}'")))
    }

    /// Cell at `row` for the named column, `None` if either does not exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&serde_json::Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

/// Information about a data source for lineage tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
    pub row_count: Option<usize>,
}

/// Trait for loading a table from a source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Load the table, optionally limiting the number of rows.
    async fn load(&self, limit: Option<usize>) -> Result<DataBatch, PrepError>;

    /// Return metadata about this source for lineage tracking.
    fn source_info(&self) -> DataSourceInfo;
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// Delimited text file on the local filesystem, plain or gzip-compressed.
///
/// Compression is detected from the gzip magic bytes rather than the file
/// extension. Empty cells load as null, and columns whose non-null cells all
/// parse as numbers are coerced to numbers.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: char,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: ',',
        }
    }
}

#[async_trait]
impl DataSource for CsvSource {
    async fn load(&self, limit: Option<usize>) -> Result<DataBatch, PrepError> {
        let path = self.path.clone();
        let delimiter = u8::try_from(self.delimiter).map_err(|_| {
            PrepError::config(format!("delimiter {:?} is not a single byte", self.delimiter))
        })?;

        // File reads and gzip inflation are blocking
        let batch = tokio::task::spawn_blocking(move || read_table(&path, delimiter, limit))
            .await
            .map_err(|e| PrepError::data_source(format!("CSV load task join error: {e}")))??;

        tracing::debug!(
            path = %self.path.display(),
            rows = batch.row_count(),
            columns = batch.column_count(),
            "Loaded table"
        );
        Ok(batch)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
            row_count: None,
        }
    }
}

fn read_table(path: &Path, delimiter: u8, limit: Option<usize>) -> Result<DataBatch, PrepError> {
    let file = File::open(path).map_err(|e| {
        PrepError::data_source(format!("Failed to open {}: {e}", path.display()))
    })?;
    let mut reader = BufReader::new(file);
    let gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    let input: Box<dyn Read> = if gzipped {
        Box::new(MultiGzDecoder::new(reader))
    } else {
        Box::new(reader)
    };
    parse_delimited(input, delimiter, limit)
}

/// Parse a delimited table with a header row from any reader.
pub fn parse_delimited<R: Read>(
    input: R,
    delimiter: u8,
    limit: Option<usize>,
) -> Result<DataBatch, PrepError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(input);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if columns.is_empty() {
        return Err(PrepError::data_format("Empty table: no header row"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        if let Some(max) = limit {
            if rows.len() >= max {
                break;
            }
        }
        let record = record?;
        let row: Vec<serde_json::Value> = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(cell.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    let mut batch = DataBatch::new(columns, rows);
    coerce_numeric_columns(&mut batch);
    Ok(batch)
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// A table already held in memory, e.g. fetched by an external retrieval layer.
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub name: String,
    pub batch: DataBatch,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, batch: DataBatch) -> Self {
        Self {
            name: name.into(),
            batch,
        }
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn load(&self, limit: Option<usize>) -> Result<DataBatch, PrepError> {
        let mut batch = self.batch.clone();
        if let Some(max) = limit {
            batch.rows.truncate(max);
            batch.total_rows = batch.rows.len();
        }
        Ok(batch)
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "memory".to_string(),
            location: self.name.clone(),
            accessed_at: chrono::Utc::now(),
            row_count: Some(self.batch.row_count()),
        }
    }
}

/// Resolve a location string to a source.
///
/// Plain paths and `file://` URIs map to [`CsvSource`]. Any other scheme is
/// rejected: object-storage and HTTP retrieval are provided by callers through
/// their own [`DataSource`] implementations.
pub fn source_for_location(location: &str) -> Result<Box<dyn DataSource>, PrepError> {
    if let Some(path) = location.strip_prefix("file://") {
        return Ok(Box::new(CsvSource::new(path)));
    }
    if let Some((scheme, _)) = location.split_once("://") {
        return Err(PrepError::data_source(format!(
            "no loader for '{scheme}://' locations ({location}); supply a DataSource for it"
        )));
    }
    Ok(Box::new(CsvSource::new(location)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const CALENDAR: &str = "listing_id,date,available,price\n\
                            1,2019-07-01,t,$85.00\n\
                            1,2019-07-02,f,\n";

    #[test]
    fn test_parse_delimited_nulls_and_numbers() {
        let batch = parse_delimited(CALENDAR.as_bytes(), b',', None).unwrap();
        assert_eq!(batch.columns, vec!["listing_id", "date", "available", "price"]);
        assert_eq!(batch.row_count(), 2);
        assert_eq!(batch.value(0, "listing_id"), Some(&serde_json::json!(1)));
        assert_eq!(batch.value(0, "available"), Some(&serde_json::json!("t")));
        assert_eq!(batch.value(1, "price"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_parse_delimited_limit() {
        let batch = parse_delimited(CALENDAR.as_bytes(), b',', Some(1)).unwrap();
        assert_eq!(batch.row_count(), 1);
        assert_eq!(batch.total_rows, 1);
    }

    #[test]
    fn test_parse_delimited_ragged_row_is_format_error() {
        let err = parse_delimited("a,b\n1,2,3\n".as_bytes(), b',', None).unwrap_err();
        assert!(matches!(err, PrepError::DataFormat(_)));
    }

    #[test]
    fn test_require_column() {
        let batch = parse_delimited(CALENDAR.as_bytes(), b',', None).unwrap();
        assert_eq!(batch.require_column("date").unwrap(), 1);
        let err = batch.require_column("listing").unwrap_err();
        assert!(err.to_string().contains("listing"));
    }

    #[tokio::test]
    async fn test_csv_source_reads_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.csv.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(CALENDAR.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let batch = CsvSource::new(&path).load(None).await.unwrap();
        assert_eq!(batch.row_count(), 2);
        assert_eq!(batch.value(1, "available"), Some(&serde_json::json!("f")));
    }

    #[tokio::test]
    async fn test_csv_source_reads_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.csv");
        std::fs::write(&path, CALENDAR).unwrap();

        let batch = CsvSource::new(&path).load(None).await.unwrap();
        assert_eq!(batch.row_count(), 2);
    }

    #[tokio::test]
    async fn test_csv_source_missing_file_is_source_error() {
        let err = CsvSource::new("/nonexistent/calendar.csv.gz")
            .load(None)
            .await
            .unwrap_err();
        assert!(matches!(err, PrepError::DataSource(_)));
    }

    #[tokio::test]
    async fn test_memory_source_limit() {
        let batch = parse_delimited(CALENDAR.as_bytes(), b',', None).unwrap();
        let src = MemorySource::new("calendar", batch);
        assert_eq!(src.load(Some(1)).await.unwrap().row_count(), 1);
        assert_eq!(src.source_info().row_count, Some(2));
    }

    #[test]
    fn test_source_for_location() {
        let src = source_for_location("file:///data/listings.csv.gz").unwrap();
        assert_eq!(src.source_info().location, "/data/listings.csv.gz");

        let src = source_for_location("data/calendar.csv.gz").unwrap();
        assert_eq!(src.source_info().source_type, "csv");

        let err = source_for_location("s3://bucket/calendar.csv.gz")
            .err()
            .unwrap();
        assert!(matches!(err, PrepError::DataSource(_)));
    }
}
