//! Lineage of a prepared table: where it came from and which steps touched it.

use crate::data::source::DataSourceInfo;
use crate::data::transform::TransformRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Full lineage record for a table.
///
/// Each applied step extends a SHA-256 chain seeded from the source, so an
/// edited or reordered step list no longer verifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLineage {
    pub dataset_id: String,
    pub source_type: String,
    pub source_location: String,
    pub transforms_applied: Vec<TransformRecord>,
    pub created_at: DateTime<Utc>,
    pub hash_chain: Vec<String>,
}

impl DataLineage {
    pub fn new(dataset_id: &str, source_type: &str, source_location: &str) -> Self {
        Self {
            dataset_id: dataset_id.to_string(),
            source_type: source_type.to_string(),
            source_location: source_location.to_string(),
            transforms_applied: Vec::new(),
            created_at: Utc::now(),
            hash_chain: vec![seed_hash(dataset_id, source_type, source_location)],
        }
    }

    /// Lineage for a table loaded from `info`, under a fresh dataset id.
    pub fn for_source(info: &DataSourceInfo) -> Self {
        let dataset_id = uuid::Uuid::new_v4().to_string();
        Self::new(&dataset_id, &info.source_type, &info.location)
    }

    /// Add a transform record and extend the hash chain.
    pub fn add_transform(&mut self, record: TransformRecord) {
        let prev_hash = self.hash_chain.last().cloned().unwrap_or_default();
        self.hash_chain.push(link_hash(&prev_hash, &record));
        self.transforms_applied.push(record);
    }

    /// Names of the applied steps, in order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.transforms_applied
            .iter()
            .map(|r| r.step.name())
            .collect()
    }

    /// Verify the integrity of the hash chain.
    pub fn verify_integrity(&self) -> bool {
        if self.hash_chain.len() != self.transforms_applied.len() + 1 {
            return false;
        }
        let seed = seed_hash(&self.dataset_id, &self.source_type, &self.source_location);
        if self.hash_chain[0] != seed {
            return false;
        }
        self.transforms_applied
            .iter()
            .zip(self.hash_chain.windows(2))
            .all(|(record, pair)| pair[1] == link_hash(&pair[0], record))
    }
}

fn seed_hash(dataset_id: &str, source_type: &str, source_location: &str) -> String {
    compute_hash(&format!("{dataset_id}:{source_type}:{source_location}"))
}

fn link_hash(prev: &str, record: &TransformRecord) -> String {
    let step_json = serde_json::to_string(&record.step).unwrap_or_default();
    compute_hash(&format!("{prev}:{step_json}"))
}

fn compute_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transform::TransformStep;

    fn drop_record(column: &str) -> TransformRecord {
        TransformRecord {
            step: TransformStep::DropColumns {
                columns: vec![column.into()],
            },
            applied_at: Utc::now(),
            rows_before: 10,
            rows_after: 10,
        }
    }

    #[test]
    fn test_lineage_creation() {
        let lineage = DataLineage::new("ds-001", "csv", "listings.csv.gz");
        assert_eq!(lineage.dataset_id, "ds-001");
        assert_eq!(lineage.hash_chain.len(), 1);
        assert!(lineage.verify_integrity());
    }

    #[test]
    fn test_lineage_with_transforms() {
        let mut lineage = DataLineage::new("ds-001", "csv", "listings.csv.gz");
        lineage.add_transform(drop_record("listing_url"));
        lineage.add_transform(drop_record("amenities"));
        assert_eq!(lineage.hash_chain.len(), 3);
        assert_eq!(lineage.step_names(), vec!["drop_columns", "drop_columns"]);
        assert!(lineage.verify_integrity());
    }

    #[test]
    fn test_tampered_step_fails_verification() {
        let mut lineage = DataLineage::new("ds-001", "csv", "listings.csv.gz");
        lineage.add_transform(drop_record("listing_url"));
        lineage.transforms_applied[0] = drop_record("price");
        assert!(!lineage.verify_integrity());
    }
}
