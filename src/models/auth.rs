//! Authentication DTOs and the signed-in session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::common::{validate_email, validate_len};
use super::user::User;
use crate::error::{AppError, Result};

/// Application role claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::parse(format!("Unknown role '{other}'"))),
        }
    }
}

/// Bearer token and role of the signed-in user.
///
/// Passed explicitly to every API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub role: Role,
    /// Id used for attendance lookups (`source_user_id`).
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub full_name: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>, role: Role) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: String::new(),
            role,
            user_id: String::new(),
            full_name: String::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with [`AppError::Forbidden`] unless this is an admin session.
    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("{action} requires the admin role")))
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl From<SigninResponse> for Session {
    fn from(resp: SigninResponse) -> Self {
        let role = resp.user.role();
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            role,
            user_id: if resp.user.source_user_id.is_empty() {
                resp.user.id
            } else {
                resp.user.source_user_id
            },
            full_name: resp.user.full_name,
        }
    }
}

/// DTO for registering an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        validate_len("password", &self.password, 8, usize::MAX)?;
        validate_len("full_name", &self.full_name, 1, usize::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub id: String,
    pub email: String,
}

/// DTO for signing in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

impl SigninRequest {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email)?;
        validate_len("password", &self.password, 1, usize::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigninResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<()> {
        validate_len("old_password", &self.old_password, 1, usize::MAX)?;
        validate_len("new_password", &self.new_password, 8, usize::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("employee".parse::<Role>().unwrap(), Role::Employee);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_employee_session_is_not_admin() {
        let session = Session::new("token", Role::Employee);
        let err = session.require_admin("Listing users").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(session.bearer(), "Bearer token");
    }

    #[test]
    fn test_session_from_signin_uses_source_user_id() {
        let json = r#"{
            "access_token": "at",
            "refresh_token": "rt",
            "user": {
                "id": "local-1",
                "source_user_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
                "full_name": "Ana",
                "application_role": { "role": "admin" }
            }
        }"#;
        let resp: SigninResponse = serde_json::from_str(json).unwrap();
        let session = Session::from(resp);
        assert!(session.is_admin());
        assert_eq!(session.user_id, "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert_eq!(session.refresh_token, "rt");
    }

    #[test]
    fn test_signup_validation() {
        let mut req = SignupRequest {
            email: "ana@example.com".into(),
            password: "longenough".into(),
            full_name: "Ana".into(),
        };
        assert!(req.validate().is_ok());
        req.password = "short".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_change_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChangeRoleRequest { role: Role::Admin }).unwrap();
        assert_eq!(json, r#"{"role":"admin"}"#);
    }
}
