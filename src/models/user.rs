//! User and profile DTOs.

use serde::{Deserialize, Serialize};

use super::auth::Role;
use super::common::{PageQuery, Pagination, push_opt, validate_date, validate_email, validate_len, validate_uuid};
use super::department::Department;
use crate::error::{AppError, Result};

/// A user account as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub source_user_id: String,
    #[serde(default)]
    pub employee_code: String,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub department: Option<serde_json::Value>,
    #[serde(default)]
    pub application_role: Option<serde_json::Value>,
}

impl User {
    /// Role claim from `application_role.role`; employees by default.
    pub fn role(&self) -> Role {
        self.application_role
            .as_ref()
            .and_then(|r| r.get("role"))
            .and_then(|r| r.as_str())
            .and_then(|r| r.parse().ok())
            .unwrap_or_default()
    }

    /// Department name when the API embedded one.
    pub fn department_name(&self) -> Option<&str> {
        self.department.as_ref()?.get("name")?.as_str()
    }
}

/// `/users` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<User>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Account status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

/// Filters for listing users.
#[derive(Debug, Clone, Default)]
pub struct ListUsersQuery {
    pub email: Option<String>,
    pub status: Option<UserStatus>,
    pub department_id: Option<String>,
    pub created_at_start: Option<String>,
    pub created_at_end: Option<String>,
    pub page: PageQuery,
}

impl ListUsersQuery {
    pub fn validate(&self) -> Result<()> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(id) = &self.department_id {
            validate_uuid("department_id", id)?;
        }
        if let Some(d) = &self.created_at_start {
            validate_date("created_at_start", d)?;
        }
        if let Some(d) = &self.created_at_end {
            validate_date("created_at_end", d)?;
        }
        self.page.validate()
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "email", self.email.as_deref());
        push_opt(&mut query, "status", self.status.as_ref().map(UserStatus::as_str));
        push_opt(&mut query, "department_id", self.department_id.as_deref());
        push_opt(&mut query, "created_at_start", self.created_at_start.as_deref());
        push_opt(&mut query, "created_at_end", self.created_at_end.as_deref());
        self.page.append_to(&mut query);
        query
    }
}

/// The signed-in user's own profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub source_user_id: String,
    #[serde(default)]
    pub employee_code: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub department_id: Option<String>,
    /// Policy of the user's department; `None` until an admin assigns one.
    #[serde(default)]
    pub department: Option<Department>,
}

/// DTO for updating the signed-in user's profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl UpdateProfile {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.full_name {
            validate_len("full_name", name, 2, 255)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(url) = &self.avatar_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) || url.len() <= "https://".len() {
                return Err(AppError::validation("avatar_url must be an http(s) URL"));
            }
        }
        if let Some(address) = &self.address {
            validate_len("address", address, 0, 500)?;
        }
        Ok(())
    }
}

/// Optional leading `+`, then 8 to 15 digits.
fn validate_phone(phone: &str) -> Result<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::validation(format!("Invalid phone number '{phone}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_application_role() {
        let json = r#"{"id":"u1","application_role":{"role":"admin"}}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role(), Role::Admin);

        let plain: User = serde_json::from_str(r#"{"id":"u2"}"#).unwrap();
        assert_eq!(plain.role(), Role::Employee);
    }

    #[test]
    fn test_profile_embeds_department_policy() {
        let json = r#"{
            "id": "u1",
            "source_user_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "employee_code": "EMP-001",
            "full_name": "Ana",
            "department": {
                "id": "d1",
                "name": "Engineering",
                "max_clock_in_time": "09:00:00",
                "max_clock_out_time": "17:00:00"
            }
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        let dept = profile.department.unwrap();
        assert_eq!(dept.max_clock_in_time, "09:00:00");
    }

    #[test]
    fn test_list_users_query() {
        let q = ListUsersQuery {
            status: Some(UserStatus::Active),
            created_at_start: Some("2024-01-01".into()),
            page: PageQuery::new(Some(1), Some(10)),
            ..Default::default()
        };
        assert!(q.validate().is_ok());
        let query = q.to_query();
        assert_eq!(query[0], ("status", "active".to_string()));
        assert_eq!(query.len(), 4);
    }

    #[test]
    fn test_update_profile_validation() {
        let ok = UpdateProfile {
            phone: Some("+6281234567".into()),
            avatar_url: Some("https://cdn.example.com/a.png".into()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad_phone = UpdateProfile {
            phone: Some("12-34".into()),
            ..Default::default()
        };
        assert!(bad_phone.validate().is_err());

        let bad_name = UpdateProfile {
            full_name: Some("A".into()),
            ..Default::default()
        };
        assert!(bad_name.validate().is_err());

        let long_address = UpdateProfile {
            address: Some("x".repeat(501)),
            ..Default::default()
        };
        assert!(long_address.validate().is_err());
    }
}
