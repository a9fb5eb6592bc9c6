//! Attendance session tracking.
//!
//! Derives the current clock state from raw events and rolls evaluated history
//! up into punctuality statistics.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::attendance::{AttendanceRecord, AttendanceResponse, ClockStatus, CurrentStatusResponse, Direction};
use crate::models::department::Department;
use crate::punctuality::{Evaluator, PunctualityResult, PunctualityStatus, Zone, parse_timestamp};

/// Whether a user is clocked in, with the latest timestamp of each kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentStatus {
    pub status: ClockStatus,
    pub clock_in: Option<String>,
    pub clock_out: Option<String>,
}

impl CurrentStatus {
    pub fn not_clocked() -> Self {
        Self {
            status: ClockStatus::NotClocked,
            clock_in: None,
            clock_out: None,
        }
    }

    pub fn is_clocked_in(&self) -> bool {
        self.status == ClockStatus::ClockedIn
    }

    /// The clock action a user in this state would take next.
    pub fn next_action(&self) -> Direction {
        if self.is_clocked_in() {
            Direction::Out
        } else {
            Direction::In
        }
    }

    /// State after a successful clock action.
    ///
    /// Only called on success; a rejected action leaves the previous state as it was.
    pub fn after_clock(&self, direction: Direction, response: &AttendanceResponse) -> Self {
        match direction {
            Direction::In => Self {
                status: ClockStatus::ClockedIn,
                clock_in: response.clock_in.clone().or_else(|| self.clock_in.clone()),
                clock_out: None,
            },
            Direction::Out => Self {
                status: ClockStatus::ClockedOut,
                clock_in: response.clock_in.clone().or_else(|| self.clock_in.clone()),
                clock_out: response.clock_out.clone().or_else(|| self.clock_out.clone()),
            },
        }
    }
}

impl From<&CurrentStatusResponse> for CurrentStatus {
    fn from(resp: &CurrentStatusResponse) -> Self {
        Self {
            status: resp.status,
            clock_in: resp.clock_in.clone(),
            clock_out: resp.clock_out.clone(),
        }
    }
}

/// Aggregate punctuality counts over a window of history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatistics {
    pub on_time_count: usize,
    pub late_count: usize,
    pub early_count: usize,
    pub unknown_count: usize,
    /// All records seen, `unknown` included.
    pub total: usize,
}

impl SessionStatistics {
    pub fn record(&mut self, status: PunctualityStatus) {
        match status {
            PunctualityStatus::OnTime => self.on_time_count += 1,
            PunctualityStatus::Late => self.late_count += 1,
            PunctualityStatus::Early => self.early_count += 1,
            PunctualityStatus::Unknown => self.unknown_count += 1,
        }
        self.total += 1;
    }

    /// Share of on-time records in percent; 0 for an empty window.
    pub fn on_time_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.on_time_count as f64 / self.total as f64 * 100.0
        }
    }
}

/// A history record paired with its punctuality outcome.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluatedRecord {
    pub record: AttendanceRecord,
    /// Event time in the evaluation zone, when it parses.
    pub local_time: Option<NaiveDateTime>,
    /// Applicable cutoff as `HH:MM`.
    pub deadline: String,
    pub result: PunctualityResult,
}

/// Tracks sessions and punctuality for one evaluation zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionTracker {
    evaluator: Evaluator,
}

impl SessionTracker {
    pub fn new(zone: Zone) -> Self {
        Self {
            evaluator: Evaluator::new(zone),
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn zone(&self) -> Zone {
        self.evaluator.zone()
    }

    /// Infer the clock state from raw events of the current period.
    ///
    /// Events whose timestamp is missing or does not parse are ignored. When
    /// the latest clock-in and clock-out share an instant the session counts as closed.
    pub fn derive_current_status<'a, I>(&self, events: I) -> CurrentStatus
    where
        I: IntoIterator<Item = &'a AttendanceRecord>,
    {
        let zone = self.zone();
        let mut last_in: Option<(NaiveDateTime, &str)> = None;
        let mut last_out: Option<(NaiveDateTime, &str)> = None;

        for event in events {
            let Some(raw) = event.date_attendance.as_deref() else {
                continue;
            };
            let Some(at) = parse_timestamp(raw, zone) else {
                continue;
            };
            let slot = match event.attendance_type {
                Direction::In => &mut last_in,
                Direction::Out => &mut last_out,
            };
            if slot.is_none_or(|(prev, _)| at > prev) {
                *slot = Some((at, raw));
            }
        }

        let status = match (last_in, last_out) {
            (None, None) => ClockStatus::NotClocked,
            (Some(_), None) => ClockStatus::ClockedIn,
            (None, Some(_)) => ClockStatus::ClockedOut,
            (Some((i, _)), Some((o, _))) if o >= i => ClockStatus::ClockedOut,
            (Some(_), Some(_)) => ClockStatus::ClockedIn,
        };

        CurrentStatus {
            status,
            clock_in: last_in.map(|(_, raw)| raw.to_string()),
            clock_out: last_out.map(|(_, raw)| raw.to_string()),
        }
    }

    /// Events whose local calendar date is `date`.
    pub fn events_on<'a>(&self, events: &'a [AttendanceRecord], date: NaiveDate) -> Vec<&'a AttendanceRecord> {
        let zone = self.zone();
        events
            .iter()
            .filter(|e| {
                e.date_attendance
                    .as_deref()
                    .and_then(|raw| parse_timestamp(raw, zone))
                    .is_some_and(|at| at.date() == date)
            })
            .collect()
    }

    /// Evaluate each record against the policy, using the record's own direction.
    pub fn evaluate_history(&self, history: &[AttendanceRecord], policy: &Department) -> Vec<EvaluatedRecord> {
        history
            .iter()
            .map(|record| {
                let direction = record.attendance_type;
                EvaluatedRecord {
                    local_time: record
                        .date_attendance
                        .as_deref()
                        .and_then(|raw| parse_timestamp(raw, self.zone())),
                    deadline: policy.cutoff_label(direction),
                    result: self.evaluator.evaluate(record, policy, direction),
                    record: record.clone(),
                }
            })
            .collect()
    }

    /// Punctuality statistics over `history`.
    pub fn aggregate(&self, history: &[AttendanceRecord], policy: &Department) -> SessionStatistics {
        let mut stats = SessionStatistics::default();
        for record in history {
            let result = self.evaluator.evaluate(record, policy, record.attendance_type);
            stats.record(result.status);
        }
        stats
    }
}

/// Statistics over already-evaluated records.
pub fn summarize(evaluated: &[EvaluatedRecord]) -> SessionStatistics {
    let mut stats = SessionStatistics::default();
    for e in evaluated {
        stats.record(e.result.status);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> SessionTracker {
        SessionTracker::new(Zone::utc())
    }

    fn event(id: &str, ts: Option<&str>, direction: Direction) -> AttendanceRecord {
        AttendanceRecord {
            id: id.into(),
            employee_code: "EMP-001".into(),
            attendance_id: "a1".into(),
            date_attendance: ts.map(String::from),
            attendance_type: direction,
            description: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn policy() -> Department {
        Department {
            id: "d1".into(),
            name: "Engineering".into(),
            max_clock_in_time: "2024-01-01T09:00:00Z".into(),
            max_clock_out_time: "17:00:00".into(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_no_events_is_not_clocked() {
        let events: Vec<AttendanceRecord> = Vec::new();
        let status = tracker().derive_current_status(&events);
        assert_eq!(status, CurrentStatus::not_clocked());
        assert_eq!(status.next_action(), Direction::In);
    }

    #[test]
    fn test_unmatched_clock_in_is_clocked_in() {
        let events = [event("1", Some("2024-03-05T08:55:00Z"), Direction::In)];
        let status = tracker().derive_current_status(&events);
        assert_eq!(status.status, ClockStatus::ClockedIn);
        assert_eq!(status.clock_in.as_deref(), Some("2024-03-05T08:55:00Z"));
        assert!(status.clock_out.is_none());
        assert_eq!(status.next_action(), Direction::Out);
    }

    #[test]
    fn test_clock_out_after_clock_in_is_clocked_out() {
        let events = [
            event("2", Some("2024-03-05T17:05:00Z"), Direction::Out),
            event("1", Some("2024-03-05T08:55:00Z"), Direction::In),
        ];
        let status = tracker().derive_current_status(&events);
        assert_eq!(status.status, ClockStatus::ClockedOut);
        assert_eq!(status.clock_out.as_deref(), Some("2024-03-05T17:05:00Z"));
    }

    #[test]
    fn test_reopened_session_is_clocked_in() {
        let events = [
            event("1", Some("2024-03-05T08:55:00Z"), Direction::In),
            event("2", Some("2024-03-05T12:00:00Z"), Direction::Out),
            event("3", Some("2024-03-05T13:00:00Z"), Direction::In),
        ];
        let status = tracker().derive_current_status(&events);
        assert_eq!(status.status, ClockStatus::ClockedIn);
        assert_eq!(status.clock_in.as_deref(), Some("2024-03-05T13:00:00Z"));
        assert_eq!(status.clock_out.as_deref(), Some("2024-03-05T12:00:00Z"));
    }

    #[test]
    fn test_events_without_time_are_ignored() {
        let events = [event("1", None, Direction::In), event("2", Some("garbage"), Direction::Out)];
        assert_eq!(tracker().derive_current_status(&events).status, ClockStatus::NotClocked);
    }

    #[test]
    fn test_events_on_filters_by_local_date() {
        let events = [
            event("1", Some("2024-03-04T08:55:00Z"), Direction::In),
            event("2", Some("2024-03-05T08:50:00Z"), Direction::In),
            event("3", None, Direction::Out),
        ];
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let today = tracker().events_on(&events, day);
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].id, "2");
        assert_eq!(tracker().derive_current_status(today).status, ClockStatus::ClockedIn);
    }

    #[test]
    fn test_after_clock_updates_state() {
        let response = AttendanceResponse {
            id: "x".into(),
            employee_code: "EMP-001".into(),
            attendance_id: "a1".into(),
            clock_in: Some("2024-03-05T08:55:00Z".into()),
            clock_out: None,
            created_at: None,
            updated_at: None,
        };
        let opened = CurrentStatus::not_clocked().after_clock(Direction::In, &response);
        assert!(opened.is_clocked_in());

        let closed_resp = AttendanceResponse {
            clock_out: Some("2024-03-05T17:01:00Z".into()),
            ..response
        };
        let closed = opened.after_clock(Direction::Out, &closed_resp);
        assert_eq!(closed.status, ClockStatus::ClockedOut);
        assert_eq!(closed.clock_out.as_deref(), Some("2024-03-05T17:01:00Z"));
    }

    #[test]
    fn test_aggregate_empty_history() {
        let stats = tracker().aggregate(&[], &policy());
        assert_eq!(stats, SessionStatistics::default());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.on_time_percentage(), 0.0);
        assert!(!stats.on_time_percentage().is_nan());
    }

    #[test]
    fn test_aggregate_counts_each_status_and_includes_unknown_in_total() {
        let history = [
            event("1", Some("2024-03-04T08:50:00Z"), Direction::In),
            event("2", Some("2024-03-04T17:10:00Z"), Direction::Out),
            event("3", Some("2024-03-05T09:20:00Z"), Direction::In),
            event("4", Some("2024-03-05T16:30:00Z"), Direction::Out),
            event("5", None, Direction::In),
        ];
        let stats = tracker().aggregate(&history, &policy());
        assert_eq!(stats.on_time_count, 2);
        assert_eq!(stats.late_count, 1);
        assert_eq!(stats.early_count, 1);
        assert_eq!(stats.unknown_count, 1);
        assert_eq!(stats.total, 5);
        assert!((stats.on_time_percentage() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_evaluate_history_matches_aggregate() {
        let history = [
            event("1", Some("2024-03-05T09:15:00Z"), Direction::In),
            event("2", Some("2024-03-05T16:45:00Z"), Direction::Out),
        ];
        let evaluated = tracker().evaluate_history(&history, &policy());
        assert_eq!(evaluated[0].result.message, "Late by 15 minutes");
        assert_eq!(evaluated[0].deadline, "09:00");
        assert_eq!(evaluated[1].result.message, "Left early by 15 minutes");
        assert_eq!(evaluated[1].deadline, "17:00");
        assert_eq!(summarize(&evaluated), tracker().aggregate(&history, &policy()));
    }
}
