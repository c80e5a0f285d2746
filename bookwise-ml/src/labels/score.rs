//! Booking score: the rise in unavailability from snapshot A to snapshot B.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label row for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookingScoreRecord {
    pub listing_id: i64,
    /// Snapshot A ratio used as the baseline (after any reset).
    pub ratio_a: f64,
    pub ratio_b: f64,
    /// `ratio_b - ratio_a`, never negative.
    pub booking_score: f64,
    /// Set when a saturated 1.0 baseline was reset to 0.
    pub baseline_reset: bool,
}

/// Counts of what happened to the listings seen in snapshot B.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub listings_in_b: usize,
    pub missing_in_a: usize,
    pub stale_dropped: usize,
    pub baselines_reset: usize,
    pub negative_dropped: usize,
}

/// Booking scores keyed by listing id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingScoreTable {
    pub records: BTreeMap<i64, BookingScoreRecord>,
    pub summary: LabelSummary,
}

impl BookingScoreTable {
    /// Join A's ratios onto B's and apply the scoring rules.
    ///
    /// * every listing with a B ratio is considered; a missing A ratio counts as 0
    /// * 1.0 in both snapshots is a stale, never-bookable listing and is dropped
    /// * a 1.0 baseline next to a partial B ratio points at a host policy change
    ///   after A, so the baseline is reset to 0
    /// * a negative score is an outlier and is dropped
    pub fn from_ratios(ratios_b: &BTreeMap<i64, f64>, ratios_a: &BTreeMap<i64, f64>) -> Self {
        let mut table = Self::default();
        table.summary.listings_in_b = ratios_b.len();

        for (&listing_id, &ratio_b) in ratios_b {
            let ratio_a = match ratios_a.get(&listing_id) {
                Some(&r) => r,
                None => {
                    table.summary.missing_in_a += 1;
                    0.0
                }
            };

            if ratio_a == 1.0 && ratio_b == 1.0 {
                table.summary.stale_dropped += 1;
                continue;
            }

            let baseline_reset = ratio_a == 1.0;
            let ratio_a = if baseline_reset {
                table.summary.baselines_reset += 1;
                0.0
            } else {
                ratio_a
            };

            let booking_score = ratio_b - ratio_a;
            if booking_score < 0.0 {
                table.summary.negative_dropped += 1;
                continue;
            }

            table.records.insert(
                listing_id,
                BookingScoreRecord {
                    listing_id,
                    ratio_a,
                    ratio_b,
                    booking_score,
                    baseline_reset,
                },
            );
        }
        table
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, listing_id: i64) -> Option<&BookingScoreRecord> {
        self.records.get(&listing_id)
    }

    pub fn score(&self, listing_id: i64) -> Option<f64> {
        self.get(listing_id).map(|r| r.booking_score)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookingScoreRecord> {
        self.records.values()
    }
}
