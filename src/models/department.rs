//! Department DTOs: policy cutoffs plus create, update and assignment payloads.

use serde::{Deserialize, Serialize};

use super::attendance::Direction;
use super::common::{validate_len, validate_uuid};
use crate::error::{AppError, Result};
use crate::punctuality::CutoffTime;

/// A department and its clock policy.
///
/// `max_clock_in_time` is the latest permissible arrival and
/// `max_clock_out_time` the earliest permissible departure. Both arrive either
/// as full ISO-8601 timestamps or as bare `HH:MM:SS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub max_clock_in_time: String,
    pub max_clock_out_time: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Department {
    /// Cutoff string that applies to the given direction.
    pub fn cutoff(&self, direction: Direction) -> &str {
        match direction {
            Direction::In => &self.max_clock_in_time,
            Direction::Out => &self.max_clock_out_time,
        }
    }

    /// Cutoff rendered as `HH:MM`, or the raw string when it does not parse.
    pub fn cutoff_label(&self, direction: Direction) -> String {
        let raw = self.cutoff(direction);
        CutoffTime::parse(raw)
            .map(|c| c.time_of_day().format("%H:%M").to_string())
            .unwrap_or_else(|_| raw.to_string())
    }
}

fn validate_cutoff(field: &str, value: &str) -> Result<()> {
    CutoffTime::parse(value)
        .map(|_| ())
        .map_err(|e| AppError::validation(format!("{field}: {e}")))
}

/// DTO for creating a department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepartment {
    pub name: String,
    pub max_clock_in_time: String,
    pub max_clock_out_time: String,
}

impl CreateDepartment {
    pub fn validate(&self) -> Result<()> {
        validate_len("name", &self.name, 3, 255)?;
        validate_cutoff("max_clock_in_time", &self.max_clock_in_time)?;
        validate_cutoff("max_clock_out_time", &self.max_clock_out_time)
    }
}

/// DTO for updating a department. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDepartment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_clock_in_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_clock_out_time: Option<String>,
}

impl UpdateDepartment {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_len("name", name, 3, 255)?;
        }
        if let Some(t) = &self.max_clock_in_time {
            validate_cutoff("max_clock_in_time", t)?;
        }
        if let Some(t) = &self.max_clock_out_time {
            validate_cutoff("max_clock_out_time", t)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.max_clock_in_time.is_none() && self.max_clock_out_time.is_none()
    }
}

/// Assign a user to a department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignDepartment {
    pub department_id: String,
    pub user_id: String,
}

impl AssignDepartment {
    pub fn validate(&self) -> Result<()> {
        validate_uuid("department_id", &self.department_id)?;
        validate_uuid("user_id", &self.user_id)
    }
}
