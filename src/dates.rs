//! Calendar math for 4-day date chunks and the configured season window.
//!
//! Everything here works on `NaiveDate`, so comparisons are by calendar day
//! and no time-of-day or timezone component can drift them.

use chrono::{Datelike, Duration, NaiveDate};

use crate::model::DateChunk;

/// Days covered by a chunk, start day included.
pub const CHUNK_DAYS: i64 = 4;

/// Chunk identity is derived from the start date's calendar day: the same
/// day always yields the same id, so a re-added range reconnects with any
/// votes already stored for it.
pub fn chunk_id(start_date: NaiveDate) -> String {
    format!("chunk-{}", start_date.format("%Y-%m-%d"))
}

pub fn create_chunk(start_date: NaiveDate) -> DateChunk {
    DateChunk {
        id: chunk_id(start_date),
        start_date,
        end_date: start_date + Duration::days(CHUNK_DAYS - 1),
    }
}

/// Inclusive at both ends.
pub fn contains_date(chunk: &DateChunk, date: NaiveDate) -> bool {
    chunk.start_date <= date && date <= chunk.end_date
}

pub fn overlaps(a: &DateChunk, b: &DateChunk) -> bool {
    a.start_date <= b.end_date && b.start_date <= a.end_date
}

pub fn conflicts_with_blocked(chunk: &DateChunk, blocked_dates: &[NaiveDate]) -> bool {
    blocked_dates.iter().any(|day| contains_date(chunk, *day))
}

/// The calendar range inside which chunk start dates are eligible:
/// an opening month with an optional day-of-month floor, and an inclusive
/// closing month. Confined to a single calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonWindow {
    open_month: u32,
    open_day: u32,
    close_month: u32,
}

impl SeasonWindow {
    pub fn new(open_month: u32, open_day: u32, close_month: u32) -> Option<SeasonWindow> {
        let months_valid = (1..=12).contains(&open_month) && (1..=12).contains(&close_month);
        let day_valid = (1..=31).contains(&open_day);
        if months_valid && day_valid && open_month <= close_month {
            Some(SeasonWindow {
                open_month,
                open_day,
                close_month,
            })
        } else {
            None
        }
    }

    /// A start date is eligible only if the whole chunk lies inside the
    /// window: on or after the opening day, and ending within the closing
    /// month of the same year.
    pub fn is_eligible_start(&self, start_date: NaiveDate) -> bool {
        let end_date = start_date + Duration::days(CHUNK_DAYS - 1);
        let opened = start_date.month() > self.open_month
            || (start_date.month() == self.open_month && start_date.day() >= self.open_day);
        opened
            && start_date.month() <= self.close_month
            && end_date.month() <= self.close_month
            && end_date.year() == start_date.year()
    }
}

impl Default for SeasonWindow {
    /// July 15th through the end of November.
    fn default() -> SeasonWindow {
        SeasonWindow {
            open_month: 7,
            open_day: 15,
            close_month: 11,
        }
    }
}
