//! Data layer: loading, schema, transformation, lineage and validation.

pub mod lineage;
pub mod schema;
pub mod source;
pub mod transform;
pub mod validate;

pub use lineage::DataLineage;
pub use schema::{ColumnType, SchemaDefinition};
pub use source::{CsvSource, DataBatch, DataSource, DataSourceInfo, MemorySource, source_for_location};
pub use transform::{TransformPipeline, TransformStep};
pub use validate::DataQualityReport;
