//! Response envelope, pagination, and request validation helpers shared by all endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Envelope status reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// Every API response is wrapped in this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub status: EnvelopeStatus,
    pub status_code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub payload: Payload<T>,
}

/// Envelope payload: data on success, error strings on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Payload<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> Default for Payload<T> {
    fn default() -> Self {
        Self {
            data: None,
            errors: Vec::new(),
        }
    }
}

impl<T> ApiResponse<T> {
    /// Whether the server reported success.
    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Success
    }

    /// Unwrap the envelope into its data, turning error envelopes into [`AppError::Api`].
    ///
    /// Endpoints that return `null` data on success use `T = ()`; see [`ApiResponse::into_unit`].
    pub fn into_data(self) -> Result<T> {
        if !self.is_success() {
            return Err(self.into_error());
        }
        let status_code = self.status_code;
        self.payload
            .data
            .ok_or_else(|| AppError::api(status_code, "Response contained no data"))
    }

    /// Unwrap an envelope whose success payload is `null`.
    pub fn into_unit(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> AppError {
        let mut message = if self.message.is_empty() {
            "Unexpected server error".to_string()
        } else {
            self.message
        };
        if !self.payload.errors.is_empty() {
            message = format!("{message} ({})", self.payload.errors.join("; "));
        }
        AppError::api(self.status_code, message)
    }
}

/// Pagination block returned by list endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub next_page: Option<u32>,
}

/// Page and limit shared by list requests.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self { page, limit }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page == Some(0) {
            return Err(AppError::validation("page must be at least 1"));
        }
        if let Some(limit) = self.limit {
            if !(1..=100).contains(&limit) {
                return Err(AppError::validation("limit must be between 1 and 100"));
            }
        }
        Ok(())
    }

    pub(crate) fn append_to(&self, query: &mut Vec<(&'static str, String)>) {
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
    }
}

/// Check a `YYYY-MM-DD` date string.
pub fn validate_date(field: &str, value: &str) -> Result<()> {
    let well_formed = value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    if well_formed {
        Ok(())
    } else {
        Err(AppError::validation(format!("{field} must be a YYYY-MM-DD date, got '{value}'")))
    }
}

/// Check a UUID identifier.
pub fn validate_uuid(field: &str, value: &str) -> Result<()> {
    Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| AppError::validation(format!("{field} must be a UUID, got '{value}'")))
}

/// Check an e-mail address: one `@`, non-empty local part, dotted domain.
pub fn validate_email(value: &str) -> Result<()> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!("Invalid email address '{value}'")))
    }
}

/// Check a string length in characters, inclusive bounds.
pub fn validate_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(AppError::validation(format!("{field} must be at least {min} characters")));
    }
    if len > max {
        return Err(AppError::validation(format!("{field} must be at most {max} characters")));
    }
    Ok(())
}

/// Push `key=value` onto a query list when the value is present.
pub(crate) fn push_opt(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
    if let Some(v) = value {
        if !v.is_empty() {
            query.push((key, v.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    fn decode<T: DeserializeOwned>(json: &str) -> ApiResponse<T> {
        serde_json::from_str(json).unwrap()
    }

    #[derive(Debug, Deserialize)]
    struct Clocked {
        id: String,
    }

    #[test]
    fn test_envelope_decodes_for_any_payload_type() {
        let ok: ApiResponse<Clocked> =
            decode(r#"{"status":"success","status_code":200,"message":"ok","payload":{"data":{"id":"att-1"}}}"#);
        assert_eq!(ok.into_data().unwrap().id, "att-1");

        // payload omitted entirely
        let bare: ApiResponse<Clocked> = decode(r#"{"status":"error","status_code":409,"message":"Already clocked in"}"#);
        let err = bare.into_data().unwrap_err();
        assert_eq!(err.to_string(), "Already clocked in");
    }

    #[test]
    fn test_error_envelope_carries_message_and_errors() {
        let json = r#"{
            "status": "error",
            "status_code": 400,
            "message": "You have not clocked in yet",
            "payload": { "data": null, "errors": ["no open session"] }
        }"#;
        let resp: ApiResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        let err = resp.into_data().unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.to_string(), "You have not clocked in yet (no open session)");
    }

    #[test]
    fn test_success_envelope_with_null_data() {
        let json = r#"{"status":"success","status_code":200,"message":"ok","payload":{"data":null,"errors":[]}}"#;
        let resp: ApiResponse<()> = serde_json::from_str(json).unwrap();
        assert!(resp.into_unit().is_ok());
    }

    #[test]
    fn test_page_query_bounds() {
        assert!(PageQuery::new(Some(1), Some(100)).validate().is_ok());
        assert!(PageQuery::new(Some(0), None).validate().is_err());
        assert!(PageQuery::new(None, Some(0)).validate().is_err());
        assert!(PageQuery::new(None, Some(101)).validate().is_err());
    }

    #[test]
    fn test_validate_date() {
        assert!(validate_date("date", "2024-03-05").is_ok());
        assert!(validate_date("date", "2024-3-5").is_err());
        assert!(validate_date("date", "2024-02-30").is_err());
        assert!(validate_date("date", "yesterday").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("user_id", "67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
        assert!(validate_uuid("user_id", "42").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana@localhost").is_err());
        assert!(validate_email("ana.example.com").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_len() {
        assert!(validate_len("name", "Ops", 3, 255).is_ok());
        assert!(validate_len("name", "HR", 3, 255).is_err());
        assert!(validate_len("name", &"x".repeat(256), 3, 255).is_err());
    }
}
