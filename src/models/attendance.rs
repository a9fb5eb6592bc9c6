//! Attendance DTOs and request payloads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{PageQuery, push_opt, validate_date, validate_uuid};
use crate::error::Result;

/// Which boundary of a work session a record marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One clock event from `/attendance/history`.
///
/// `date_attendance` stays a string: a missing or unparseable value is a
/// punctuality outcome (`unknown`), not a decoding failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    #[serde(default)]
    pub employee_code: String,
    #[serde(default)]
    pub attendance_id: String,
    #[serde(default)]
    pub date_attendance: Option<String>,
    pub attendance_type: Direction,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Result of a clock-in or clock-out action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub id: String,
    #[serde(default)]
    pub employee_code: String,
    #[serde(default)]
    pub attendance_id: String,
    pub clock_in: Option<String>,
    pub clock_out: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Row of the admin attendance log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceLog {
    pub attendance_id: String,
    pub employee_code: String,
    pub full_name: String,
    #[serde(default)]
    pub department_name: String,
    pub clock_in: Option<String>,
    pub clock_out: Option<String>,
    #[serde(default)]
    pub in_punctuality: String,
    #[serde(default)]
    pub out_punctuality: String,
}

/// Clock state as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockStatus {
    #[serde(rename = "Clocked In")]
    ClockedIn,
    #[serde(rename = "Clocked Out")]
    ClockedOut,
    #[serde(rename = "Not Clocked")]
    NotClocked,
}

impl ClockStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ClockStatus::ClockedIn => "Clocked In",
            ClockStatus::ClockedOut => "Clocked Out",
            ClockStatus::NotClocked => "Not Clocked",
        }
    }
}

impl fmt::Display for ClockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// `/attendance/current-status` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStatusResponse {
    pub user_id: String,
    #[serde(default)]
    pub employee_code: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub department: Option<String>,
    pub status: ClockStatus,
    #[serde(default)]
    pub clock_in: Option<String>,
    #[serde(default)]
    pub clock_out: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// `/attendance/admin` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminDashboard {
    #[serde(default)]
    pub total_employees_per_dept: BTreeMap<String, u64>,
    #[serde(default)]
    pub total_updated_depts: u64,
    #[serde(default)]
    pub total_today_registrations: u64,
}

/// Filters for the admin attendance log.
#[derive(Debug, Clone, Default)]
pub struct AttendanceLogsQuery {
    pub date: Option<String>,
    pub department_id: Option<String>,
    pub page: PageQuery,
}

impl AttendanceLogsQuery {
    pub fn validate(&self) -> Result<()> {
        if let Some(date) = &self.date {
            validate_date("date", date)?;
        }
        if let Some(id) = &self.department_id {
            validate_uuid("department_id", id)?;
        }
        self.page.validate()
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "date", self.date.as_deref());
        push_opt(&mut query, "department_id", self.department_id.as_deref());
        self.page.append_to(&mut query);
        query
    }
}

/// Attendance history of one user.
#[derive(Debug, Clone)]
pub struct AttendanceHistoryQuery {
    pub user_id: String,
    pub page: PageQuery,
}

impl AttendanceHistoryQuery {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            page: PageQuery::default(),
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.page.limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_uuid("user_id", &self.user_id)?;
        self.page.validate()
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("user_id", self.user_id.clone())];
        self.page.append_to(&mut query);
        query
    }
}

/// Date window for the admin dashboard.
#[derive(Debug, Clone, Default)]
pub struct AdminDashboardQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl AdminDashboardQuery {
    pub fn validate(&self) -> Result<()> {
        if let Some(d) = &self.start_date {
            validate_date("start_date", d)?;
        }
        if let Some(d) = &self.end_date {
            validate_date("end_date", d)?;
        }
        Ok(())
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "start_date", self.start_date.as_deref());
        push_opt(&mut query, "end_date", self.end_date.as_deref());
        query
    }
}

/// Current-status lookup; without a user id the server answers for the token's owner.
#[derive(Debug, Clone, Default)]
pub struct CurrentStatusQuery {
    pub user_id: Option<String>,
}

impl CurrentStatusQuery {
    pub fn validate(&self) -> Result<()> {
        match &self.user_id {
            Some(id) => validate_uuid("user_id", id),
            None => Ok(()),
        }
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "user_id", self.user_id.as_deref());
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_record_without_timestamp() {
        let json = r#"{"id":"a1","attendance_type":"out","date_attendance":null}"#;
        let record: AttendanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.attendance_type, Direction::Out);
        assert!(record.date_attendance.is_none());
    }

    #[test]
    fn test_current_status_labels() {
        let json = r#"{
            "user_id": "u1",
            "employee_code": "EMP-001",
            "full_name": "Ana",
            "status": "Clocked In",
            "clock_in": "2024-03-05T08:55:00Z",
            "clock_out": null,
            "updated_at": "2024-03-05T08:55:00Z"
        }"#;
        let status: CurrentStatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(status.status, ClockStatus::ClockedIn);
        assert_eq!(status.status.to_string(), "Clocked In");
        assert!(status.department.is_none());
    }

    #[test]
    fn test_logs_query_skips_empty_filters() {
        let query = AttendanceLogsQuery {
            date: Some("2024-03-05".into()),
            department_id: None,
            page: PageQuery::new(Some(2), Some(20)),
        };
        assert!(query.validate().is_ok());
        assert_eq!(
            query.to_query(),
            vec![
                ("date", "2024-03-05".to_string()),
                ("page", "2".to_string()),
                ("limit", "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_history_query_requires_uuid() {
        assert!(AttendanceHistoryQuery::new("not-a-uuid").validate().is_err());
        let q = AttendanceHistoryQuery::new("67e55044-10b1-426f-9247-bb680e5fe0c8").with_limit(4);
        assert!(q.validate().is_ok());
        assert_eq!(q.to_query().len(), 2);
    }

    #[test]
    fn test_admin_dashboard_query_rejects_bad_dates() {
        let q = AdminDashboardQuery {
            start_date: Some("2024/03/01".into()),
            end_date: None,
        };
        assert!(q.validate().is_err());
    }
}
