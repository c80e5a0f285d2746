//! Label derivation: booking scores from two calendar snapshots.
//!
//! Snapshot B is the later pull. For each snapshot the share of unavailable
//! days per listing is measured over a window that starts at the snapshot's
//! earliest date, and the label is how much that share grew from A to B.

pub mod calendar;
pub mod score;

pub use calendar::{AvailabilityRatio, BookingWindow, CalendarRecord, availability_ratios, parse_calendar};
pub use score::{BookingScoreRecord, BookingScoreTable, LabelSummary};

use crate::config::{LabelConfig, WindowAlignment};
use crate::data::source::{DataBatch, DataSource};
use crate::error::PrepError;
use std::collections::BTreeMap;

/// Derive booking scores from loaded calendar snapshots.
pub fn derive_booking_score(
    snapshot_b: &DataBatch,
    snapshot_a: &DataBatch,
    config: &LabelConfig,
) -> Result<BookingScoreTable, PrepError> {
    let records_b = parse_calendar(snapshot_b).map_err(|e| e.with_prefix("snapshot B"))?;
    let records_a = parse_calendar(snapshot_a).map_err(|e| e.with_prefix("snapshot A"))?;

    let Some(window_b) = BookingWindow::from_records(&records_b, config.window_days) else {
        tracing::warn!("Snapshot B has no calendar records; no listings can be scored");
        return Ok(BookingScoreTable::default());
    };
    let window_a = match config.alignment {
        WindowAlignment::Independent => {
            BookingWindow::from_records(&records_a, config.window_days)
        }
        WindowAlignment::SharedWithB => Some(window_b),
    };
    if window_a.is_none() {
        tracing::warn!("Snapshot A has no calendar records; every baseline counts as 0");
    }

    let ratios_b = ratio_values(&availability_ratios(&records_b, &window_b));
    let ratios_a = window_a
        .map(|w| ratio_values(&availability_ratios(&records_a, &w)))
        .unwrap_or_default();

    let table = BookingScoreTable::from_ratios(&ratios_b, &ratios_a);
    tracing::info!(
        window_b_start = %window_b.start,
        window_b_end = %window_b.end,
        window_a_start = ?window_a.map(|w| w.start),
        listings_in_b = table.summary.listings_in_b,
        stale_dropped = table.summary.stale_dropped,
        baselines_reset = table.summary.baselines_reset,
        negative_dropped = table.summary.negative_dropped,
        scored = table.len(),
        "Derived booking scores"
    );
    Ok(table)
}

/// Load both snapshots from their sources and derive booking scores.
pub async fn derive_booking_score_from(
    source_b: &dyn DataSource,
    source_a: &dyn DataSource,
    config: &LabelConfig,
) -> Result<BookingScoreTable, PrepError> {
    let snapshot_b = source_b.load(None).await?;
    let snapshot_a = source_a.load(None).await?;
    derive_booking_score(&snapshot_b, &snapshot_a, config)
}

fn ratio_values(counts: &BTreeMap<i64, AvailabilityRatio>) -> BTreeMap<i64, f64> {
    counts
        .iter()
        .filter_map(|(&id, counts)| counts.ratio().map(|r| (id, r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::MemorySource;
    use chrono::{Days, NaiveDate};
    use serde_json::json;

    /// Calendar rows for one listing: `flags[i]` is the flag on `start + i`.
    fn listing_days(id: i64, start: &str, flags: &str) -> Vec<Vec<serde_json::Value>> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap();
        flags
            .chars()
            .enumerate()
            .map(|(i, flag)| {
                let date = start + Days::new(i as u64);
                vec![
                    json!(id),
                    json!(date.format("%Y-%m-%d").to_string()),
                    json!(flag.to_string()),
                ]
            })
            .collect()
    }

    fn snapshot(listings: Vec<Vec<Vec<serde_json::Value>>>) -> DataBatch {
        DataBatch::new(
            vec!["listing_id".into(), "date".into(), "available".into()],
            listings.into_iter().flatten().collect(),
        )
    }

    fn config(window_days: u32) -> LabelConfig {
        LabelConfig {
            window_days,
            ..LabelConfig::default()
        }
    }

    #[test]
    fn test_derive_booking_score() {
        // window of 4 days => 5 inclusive dates
        let b = snapshot(vec![
            listing_days(1, "2019-08-01", "fftft"),
            listing_days(2, "2019-08-01", "ffttt"),
            listing_days(3, "2019-08-01", "fffff"),
        ]);
        let a = snapshot(vec![
            listing_days(1, "2019-07-01", "fffff"),
            listing_days(2, "2019-07-01", "ftttt"),
            listing_days(3, "2019-07-01", "fffff"),
        ]);
        let table = derive_booking_score(&b, &a, &config(4)).unwrap();

        assert_eq!(table.len(), 2);
        let one = table.get(1).unwrap();
        assert!((one.ratio_b - 0.6).abs() < 1e-12);
        assert!((one.booking_score - 0.6).abs() < 1e-12);
        assert!(one.baseline_reset);
        assert!((table.score(2).unwrap() - 0.2).abs() < 1e-12);
        assert!(table.get(3).is_none());
    }

    #[test]
    fn test_rows_outside_window_ignored() {
        let b = snapshot(vec![listing_days(1, "2019-08-01", "tttttffff")]);
        let a = snapshot(vec![listing_days(1, "2019-07-01", "ttttt")]);
        let table = derive_booking_score(&b, &a, &config(4)).unwrap();
        assert_eq!(table.score(1), Some(0.0));
    }

    #[test]
    fn test_independent_windows_use_each_snapshot_start() {
        // A starts a month before B. Independently, A's window covers July
        // (all booked); shared with B it covers August (all open).
        let b = snapshot(vec![listing_days(1, "2019-08-01", "fftt")]);
        let a = snapshot(vec![
            listing_days(1, "2019-07-01", "fff"),
            listing_days(1, "2019-08-01", "tttt"),
        ]);

        let independent = derive_booking_score(&b, &a, &config(3)).unwrap();
        let record = independent.get(1).unwrap();
        assert!(record.baseline_reset, "July baseline is saturated");
        assert_eq!(record.booking_score, 0.5);

        let shared = LabelConfig {
            window_days: 3,
            alignment: WindowAlignment::SharedWithB,
        };
        let record = *derive_booking_score(&b, &a, &shared).unwrap().get(1).unwrap();
        assert!(!record.baseline_reset);
        assert_eq!(record.ratio_a, 0.0);
        assert_eq!(record.booking_score, 0.5);
    }

    #[test]
    fn test_shared_window_can_drop_listing() {
        let b = snapshot(vec![listing_days(1, "2019-08-01", "fftt")]);
        let a = snapshot(vec![
            listing_days(1, "2019-07-01", "tttt"),
            listing_days(1, "2019-08-01", "ffft"),
        ]);
        let shared = LabelConfig {
            window_days: 3,
            alignment: WindowAlignment::SharedWithB,
        };
        // over B's window A was 0.75 booked, so the score goes negative
        let table = derive_booking_score(&b, &a, &shared).unwrap();
        assert!(table.get(1).is_none());
        assert_eq!(table.summary.negative_dropped, 1);
        // A's own July window is fully open
        assert_eq!(derive_booking_score(&b, &a, &config(3)).unwrap().score(1), Some(0.5));
    }

    #[test]
    fn test_empty_snapshot_b() {
        let a = snapshot(vec![listing_days(1, "2019-07-01", "ff")]);
        let table = derive_booking_score(&snapshot(vec![]), &a, &config(30)).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_missing_column_names_snapshot() {
        let b = DataBatch::new(vec!["listing_id".into(), "date".into()], vec![]);
        let a = snapshot(vec![]);
        let err = derive_booking_score(&b, &a, &config(30)).unwrap_err();
        assert!(err.to_string().contains("snapshot B"));
    }

    #[tokio::test]
    async fn test_derive_from_sources() {
        let b = MemorySource::new("b", snapshot(vec![listing_days(1, "2019-08-01", "ft")]));
        let a = MemorySource::new("a", snapshot(vec![listing_days(1, "2019-07-01", "tt")]));
        let table = derive_booking_score_from(&b, &a, &config(30)).await.unwrap();
        assert_eq!(table.score(1), Some(0.5));
    }
}
