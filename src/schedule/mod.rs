//! Schedule windows for signage items
//!
//! A playlist item may carry an optional eligibility window made of four
//! independent bounds: a first and last calendar date and a daily start and
//! end time. Bounds are stored exactly as they were written so that a
//! malformed value survives a load/save cycle; parsing happens at evaluation
//! time and an unparsable bound behaves as if it were absent.

mod clock;
mod evaluator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use evaluator::is_valid;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Date format for `start_date` / `end_date`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted formats for `start_time` / `end_time`
pub const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Optional eligibility window of a playlist item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl Schedule {
    /// True when no bound is set at all
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date.as_deref().and_then(parse_date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date.as_deref().and_then(parse_date)
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        self.start_time.as_deref().and_then(parse_time)
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        self.end_time.as_deref().and_then(parse_time)
    }
}

/// Parse a calendar date bound, `None` when empty or malformed
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Parse a time-of-day bound, `None` when empty or malformed
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}
