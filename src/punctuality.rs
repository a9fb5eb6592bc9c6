//! Punctuality evaluation.
//!
//! Compares a recorded clock event against a department cutoff and classifies
//! it as on time, late (clock-in after the cutoff) or early (clock-out before
//! the cutoff). Cutoffs are times of day; they are anchored onto the calendar
//! date of the record being evaluated, in the evaluation [`Zone`].
//!
//! Everything here is pure: no I/O, no logging, no shared state.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::attendance::{AttendanceRecord, Direction};
use crate::models::department::Department;

pub const MSG_NO_TIME: &str = "No time recorded";
pub const MSG_INVALID_TIME: &str = "Invalid time recorded";
pub const MSG_INVALID_POLICY: &str = "Invalid policy time";

/// Errors from parsing a department cutoff.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CutoffError {
    #[error("policy time is empty")]
    Empty,

    #[error("invalid ISO-8601 policy time '{0}'")]
    InvalidIso(String),

    #[error("invalid HH:MM:SS policy time '{0}'")]
    InvalidClock(String),
}

/// A parsed department cutoff.
///
/// Both shapes normalize to a whole-second time of day; the date part of an
/// ISO cutoff is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffTime {
    /// Full ISO-8601 timestamp. Holds its UTC time of day.
    Iso(NaiveTime),
    /// Bare `HH:MM[:SS]` wall-clock time.
    Clock(NaiveTime),
}

impl CutoffTime {
    /// Parse a cutoff. A `T` marks the ISO shape, anything else is split on `:`.
    pub fn parse(raw: &str) -> Result<Self, CutoffError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CutoffError::Empty);
        }
        if raw.contains('T') {
            parse_iso_time_of_day(raw)
                .map(CutoffTime::Iso)
                .ok_or_else(|| CutoffError::InvalidIso(raw.to_string()))
        } else {
            parse_clock_time(raw)
                .map(CutoffTime::Clock)
                .ok_or_else(|| CutoffError::InvalidClock(raw.to_string()))
        }
    }

    pub fn time_of_day(&self) -> NaiveTime {
        match self {
            CutoffTime::Iso(t) | CutoffTime::Clock(t) => *t,
        }
    }
}

/// UTC hour/minute/second of an ISO timestamp. Offset-less values are taken as UTC.
fn parse_iso_time_of_day(raw: &str) -> Option<NaiveTime> {
    let utc_time = DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%#z"))
        .map(|dt| dt.with_timezone(&Utc).time())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.time()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").map(|dt| dt.time()))
        .ok()?;
    utc_time.with_nanosecond(0)
}

fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let parts: Vec<&str> = raw.split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m] => (*h, *m, "0"),
        [h, m, s] => (*h, *m, *s),
        _ => return None,
    };
    let hour = h.trim().parse::<u32>().ok()?;
    let minute = m.trim().parse::<u32>().ok()?;
    // Fractional seconds are dropped
    let s = match s.trim().split_once('.') {
        Some((whole, frac)) if frac.chars().all(|c| c.is_ascii_digit()) => whole,
        Some(_) => return None,
        None => s.trim(),
    };
    let second = s.parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Time zone whose calendar the records are evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The host's local zone, DST included.
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl Zone {
    pub fn utc() -> Self {
        Zone::Fixed(Utc.fix())
    }

    /// Fixed zone `minutes` east of UTC; `None` when out of range.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Zone::Fixed)
    }

    /// Wall-clock reading of an absolute instant in this zone.
    pub fn localize(&self, instant: &DateTime<FixedOffset>) -> NaiveDateTime {
        match self {
            Zone::Local => instant.with_timezone(&Local).naive_local(),
            Zone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
        }
    }

    /// Current wall-clock time in this zone.
    pub fn now(&self) -> NaiveDateTime {
        self.localize(&Utc::now().fixed_offset())
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Fixed(offset) => write!(f, "UTC{offset}"),
        }
    }
}

/// Parse a record timestamp into wall-clock time in `zone`.
///
/// Values carrying an offset are converted; values without one are already
/// wall-clock time. A bare date means midnight.
pub fn parse_timestamp(raw: &str, zone: Zone) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(zone.localize(&dt));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(zone.localize(&dt));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%#z") {
        return Some(zone.localize(&dt));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Place a time of day on a calendar date.
pub fn anchor(date: NaiveDate, time_of_day: NaiveTime) -> NaiveDateTime {
    date.and_time(time_of_day)
}

/// Punctuality classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PunctualityStatus {
    OnTime,
    Late,
    Early,
    Unknown,
}

impl PunctualityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunctualityStatus::OnTime => "on-time",
            PunctualityStatus::Late => "late",
            PunctualityStatus::Early => "early",
            PunctualityStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PunctualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of evaluating one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunctualityResult {
    pub status: PunctualityStatus,
    /// Whole minutes late or early; `None` for on-time and unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_minutes: Option<i64>,
    pub message: String,
}

impl PunctualityResult {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            status: PunctualityStatus::Unknown,
            delta_minutes: None,
            message: message.into(),
        }
    }

    fn on_time(direction: Direction) -> Self {
        let message = match direction {
            Direction::In => "Arrived on time",
            Direction::Out => "Left on time",
        };
        Self {
            status: PunctualityStatus::OnTime,
            delta_minutes: None,
            message: message.to_string(),
        }
    }

    fn late(minutes: i64) -> Self {
        Self {
            status: PunctualityStatus::Late,
            delta_minutes: Some(minutes),
            message: format!("Late by {minutes} minutes"),
        }
    }

    fn early(minutes: i64) -> Self {
        Self {
            status: PunctualityStatus::Early,
            delta_minutes: Some(minutes),
            message: format!("Left early by {minutes} minutes"),
        }
    }
}

/// Compare an event against its anchored cutoff. Equality is on time.
pub fn classify(recorded: NaiveDateTime, cutoff: NaiveDateTime, direction: Direction) -> PunctualityResult {
    match direction {
        Direction::In if recorded <= cutoff => PunctualityResult::on_time(direction),
        Direction::In => PunctualityResult::late((recorded - cutoff).num_minutes()),
        Direction::Out if recorded >= cutoff => PunctualityResult::on_time(direction),
        Direction::Out => PunctualityResult::early((cutoff - recorded).num_minutes()),
    }
}

/// Evaluates records in a fixed zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    zone: Zone,
}

impl Evaluator {
    pub fn new(zone: Zone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Classify `record` against the department cutoff for `direction`.
    pub fn evaluate(&self, record: &AttendanceRecord, policy: &Department, direction: Direction) -> PunctualityResult {
        self.evaluate_raw(record.date_attendance.as_deref(), policy.cutoff(direction), direction)
    }

    /// Classify a raw timestamp against a raw cutoff string.
    pub fn evaluate_raw(&self, timestamp: Option<&str>, cutoff: &str, direction: Direction) -> PunctualityResult {
        let Some(raw) = timestamp.filter(|t| !t.trim().is_empty()) else {
            return PunctualityResult::unknown(MSG_NO_TIME);
        };
        let Some(recorded) = parse_timestamp(raw, self.zone) else {
            return PunctualityResult::unknown(MSG_INVALID_TIME);
        };
        let Ok(cutoff) = CutoffTime::parse(cutoff) else {
            return PunctualityResult::unknown(MSG_INVALID_POLICY);
        };
        classify(recorded, anchor(recorded.date(), cutoff.time_of_day()), direction)
    }
}

/// Classify in the host's local zone.
pub fn evaluate(record: &AttendanceRecord, policy: &Department, direction: Direction) -> PunctualityResult {
    Evaluator::default().evaluate(record, policy, direction)
}
