//! Calendar snapshot records, ratio windows and per-listing availability counts.

use crate::data::schema::value_as_i64;
use crate::data::source::DataBatch;
use crate::error::PrepError;
use crate::features::parse::parse_date;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One day of one listing in a calendar snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub listing_id: i64,
    pub date: NaiveDate,
    pub available: bool,
}

/// Parse the `listing_id`, `date` and `available` columns of a calendar snapshot.
pub fn parse_calendar(batch: &DataBatch) -> Result<Vec<CalendarRecord>, PrepError> {
    let id_idx = batch.require_column("listing_id")?;
    let date_idx = batch.require_column("date")?;
    let available_idx = batch.require_column("available")?;

    batch
        .rows
        .iter()
        .enumerate()
        .map(|(n, row)| {
            let cell = |idx: usize| row.get(idx).unwrap_or(&Value::Null);
            let listing_id = value_as_i64(cell(id_idx)).ok_or_else(|| {
                PrepError::data_format(format!("row {n}: invalid listing_id {}", cell(id_idx)))
            })?;
            let date = match cell(date_idx) {
                Value::String(s) => parse_date(s).map_err(|e| e.with_prefix(&format!("row {n}")))?,
                other => {
                    return Err(PrepError::data_format(format!("row {n}: invalid date {other}")));
                }
            };
            let available = match cell(available_idx) {
                Value::String(s) if s == "t" => true,
                Value::String(s) if s == "f" => false,
                Value::Bool(b) => *b,
                other => {
                    return Err(PrepError::data_format(format!(
                        "row {n}: invalid available flag {other}"
                    )));
                }
            };
            Ok(CalendarRecord {
                listing_id,
                date,
                available,
            })
        })
        .collect()
}

/// Inclusive date range a ratio is measured over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BookingWindow {
    pub fn starting_at(start: NaiveDate, days: u32) -> Self {
        let end = start
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Window starting at the earliest date of `records`; `None` when there are none.
    pub fn from_records(records: &[CalendarRecord], days: u32) -> Option<Self> {
        records
            .iter()
            .map(|r| r.date)
            .min()
            .map(|start| Self::starting_at(start, days))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Available / unavailable day counts of one listing inside a window.
///
/// The ratio is the share of days NOT available: a listing that is never
/// available scores 1.0 and a fully open calendar scores 0.0. Unavailable days
/// are read as booked, so a higher ratio means more booked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRatio {
    pub available_days: u32,
    pub unavailable_days: u32,
}

impl AvailabilityRatio {
    pub fn total_days(&self) -> u32 {
        self.available_days + self.unavailable_days
    }

    /// `unavailable / total`, or `None` with no days counted.
    pub fn ratio(&self) -> Option<f64> {
        match self.total_days() {
            0 => None,
            total => Some(f64::from(self.unavailable_days) / f64::from(total)),
        }
    }
}

/// Count availability per listing over the records that fall inside `window`.
///
/// Listings without any record in the window are absent from the result.
pub fn availability_ratios(
    records: &[CalendarRecord],
    window: &BookingWindow,
) -> BTreeMap<i64, AvailabilityRatio> {
    let mut counts: BTreeMap<i64, AvailabilityRatio> = BTreeMap::new();
    for record in records.iter().filter(|r| window.contains(r.date)) {
        let entry = counts.entry(record.listing_id).or_default();
        if record.available {
            entry.available_days += 1;
        } else {
            entry.unavailable_days += 1;
        }
    }
    counts
}
