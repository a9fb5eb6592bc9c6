//! Attendance REST API client.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::attendance::{
    AdminDashboard, AdminDashboardQuery, AttendanceHistoryQuery, AttendanceLog, AttendanceLogsQuery,
    AttendanceRecord, AttendanceResponse, CurrentStatusQuery, CurrentStatusResponse, Direction,
};
use crate::models::auth::{
    ChangePasswordRequest, ChangeRoleRequest, RefreshTokenRequest, RefreshTokenResponse, Session, SigninRequest,
    SigninResponse, SignupRequest, SignupResponse,
};
use crate::models::common::{ApiResponse, PageQuery, validate_uuid};
use crate::models::department::{AssignDepartment, CreateDepartment, Department, UpdateDepartment};
use crate::models::user::{ListUsersQuery, Profile, UpdateProfile, UserList};

/// Attendance API client.
///
/// Holds no credentials: every authenticated call takes the caller's
/// [`Session`]. Clock actions are sent once and never retried.
pub struct ApiClient {
    client: Client,
    base_url: String,
    device_id: String,
}

impl ApiClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `base_url` - API root (e.g., "https://hr.example.com/api/v1")
    /// * `timeout` - Per-request timeout
    /// * `device_id` - Value of the `X-Device-ID` header on sign-in
    pub fn new(base_url: &str, timeout: Duration, device_id: &str) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client, device_id))
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(base_url: &str, client: Client, device_id: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            device_id: device_id.to_string(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            &config.device_id,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> RequestBuilder {
        let url = format!("{base}{path}", base = self.base_url);
        debug!("{method} {url}");
        let builder = self.client.request(method, url);
        match session {
            Some(s) => builder.header(AUTHORIZATION, s.bearer()),
            None => builder,
        }
    }

    /// Send a request and decode the response envelope.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<ApiResponse<T>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(envelope) => {
                if !envelope.is_success() {
                    warn!("API error {}: {}", envelope.status_code, envelope.message);
                    if status == StatusCode::UNAUTHORIZED {
                        return Err(AppError::Unauthorized(envelope.message));
                    }
                }
                Ok(envelope)
            }
            Err(e) if status.is_success() => Err(AppError::parse(format!("Unexpected response body: {e}"))),
            Err(_) => {
                warn!("HTTP {status} without envelope");
                if status == StatusCode::UNAUTHORIZED {
                    return Err(AppError::Unauthorized("session expired or invalid".to_string()));
                }
                let message = status.canonical_reason().unwrap_or("Unexpected server error");
                Err(AppError::api(status.as_u16(), message))
            }
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        session: &Session,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let builder = self.request(Method::GET, path, Some(session)).query(query);
        self.send(builder).await?.into_data()
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        session: &Session,
        body: &B,
    ) -> Result<T> {
        let builder = self.request(method, path, Some(session)).json(body);
        self.send(builder).await?.into_data()
    }

    async fn send_unit(&self, method: Method, path: &str, session: &Session, body: Option<&impl Serialize>) -> Result<()> {
        let mut builder = self.request(method, path, Some(session));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send::<serde_json::Value>(builder).await?.into_unit()
    }

    // ── Auth ──

    pub async fn signup(&self, data: &SignupRequest) -> Result<SignupResponse> {
        data.validate()?;
        let builder = self.request(Method::POST, "/auth/signup", None).json(data);
        self.send(builder).await?.into_data()
    }

    pub async fn signin(&self, data: &SigninRequest) -> Result<SigninResponse> {
        data.validate()?;
        let builder = self
            .request(Method::POST, "/auth/signin", None)
            .header("X-Device-ID", &self.device_id)
            .json(data);
        self.send(builder).await?.into_data()
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshTokenResponse> {
        if refresh_token.trim().is_empty() {
            return Err(AppError::validation("refresh_token cannot be empty"));
        }
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        let builder = self
            .request(Method::POST, "/auth/refresh-token", None)
            .header("X-Device-ID", &self.device_id)
            .json(&body);
        self.send(builder).await?.into_data()
    }

    pub async fn change_password(&self, session: &Session, data: &ChangePasswordRequest) -> Result<()> {
        data.validate()?;
        self.send_unit(Method::POST, "/auth/change-password", session, Some(data))
            .await
    }

    pub async fn change_role(&self, session: &Session, data: &ChangeRoleRequest) -> Result<()> {
        self.send_unit(Method::POST, "/auth/change-role", session, Some(data))
            .await
    }

    pub async fn signout(&self, session: &Session) -> Result<()> {
        self.send_unit(Method::POST, "/auth/signout", session, None::<&()>)
            .await
    }

    // ── Attendance ──

    /// Open a work session. The server rejects this when one is already open.
    pub async fn clock_in(&self, session: &Session) -> Result<AttendanceResponse> {
        let builder = self.request(Method::POST, "/attendance/clock-in", Some(session));
        self.send(builder).await?.into_data()
    }

    /// Close the open work session. The server rejects this when none is open.
    pub async fn clock_out(&self, session: &Session) -> Result<AttendanceResponse> {
        let builder = self.request(Method::PUT, "/attendance/clock-out", Some(session));
        self.send(builder).await?.into_data()
    }

    pub async fn clock(&self, session: &Session, direction: Direction) -> Result<AttendanceResponse> {
        match direction {
            Direction::In => self.clock_in(session).await,
            Direction::Out => self.clock_out(session).await,
        }
    }

    pub async fn attendance_logs(&self, session: &Session, query: &AttendanceLogsQuery) -> Result<Vec<AttendanceLog>> {
        session.require_admin("Viewing attendance logs")?;
        query.validate()?;
        self.get("/attendance/logs", session, &query.to_query()).await
    }

    pub async fn attendance_history(
        &self,
        session: &Session,
        query: &AttendanceHistoryQuery,
    ) -> Result<Vec<AttendanceRecord>> {
        query.validate()?;
        self.get("/attendance/history", session, &query.to_query()).await
    }

    pub async fn admin_dashboard(&self, session: &Session, query: &AdminDashboardQuery) -> Result<AdminDashboard> {
        session.require_admin("Viewing the admin dashboard")?;
        query.validate()?;
        self.get("/attendance/admin", session, &query.to_query()).await
    }

    pub async fn current_status(&self, session: &Session, query: &CurrentStatusQuery) -> Result<CurrentStatusResponse> {
        query.validate()?;
        self.get("/attendance/current-status", session, &query.to_query())
            .await
    }

    // ── Departments ──

    pub async fn list_departments(&self, session: &Session, page: PageQuery) -> Result<Vec<Department>> {
        page.validate()?;
        let mut query = Vec::new();
        page.append_to(&mut query);
        self.get("/departments", session, &query).await
    }

    pub async fn get_department(&self, session: &Session, id: &str) -> Result<Department> {
        validate_uuid("department id", id)?;
        self.get(&format!("/departments/{id}"), session, &[]).await
    }

    pub async fn create_department(&self, session: &Session, data: &CreateDepartment) -> Result<Department> {
        session.require_admin("Creating departments")?;
        data.validate()?;
        self.send_json(Method::POST, "/departments", session, data).await
    }

    pub async fn update_department(&self, session: &Session, id: &str, data: &UpdateDepartment) -> Result<Department> {
        session.require_admin("Updating departments")?;
        validate_uuid("department id", id)?;
        if data.is_empty() {
            return Err(AppError::validation("Nothing to update"));
        }
        data.validate()?;
        self.send_json(Method::PUT, &format!("/departments/{id}"), session, data)
            .await
    }

    pub async fn delete_department(&self, session: &Session, id: &str) -> Result<()> {
        session.require_admin("Deleting departments")?;
        validate_uuid("department id", id)?;
        self.send_unit(Method::DELETE, &format!("/departments/{id}"), session, None::<&()>)
            .await
    }

    pub async fn assign_department(&self, session: &Session, data: &AssignDepartment) -> Result<()> {
        session.require_admin("Assigning departments")?;
        data.validate()?;
        self.send_unit(Method::POST, "/departments/assignment", session, Some(data))
            .await
    }

    // ── Users ──

    pub async fn list_users(&self, session: &Session, query: &ListUsersQuery) -> Result<UserList> {
        session.require_admin("Listing users")?;
        query.validate()?;
        self.get("/users", session, &query.to_query()).await
    }

    pub async fn profile(&self, session: &Session) -> Result<Profile> {
        self.get("/profile", session, &[]).await
    }

    pub async fn update_profile(&self, session: &Session, data: &UpdateProfile) -> Result<Profile> {
        data.validate()?;
        self.send_json(Method::PUT, "/profile", session, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:9/api/", Duration::from_secs(5), "test-device").unwrap()
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        assert_eq!(client().base_url(), "http://localhost:9/api");
    }

    #[tokio::test]
    async fn test_admin_calls_rejected_before_network() {
        let session = Session::new("token", Role::Employee);
        let err = client().list_users(&session, &ListUsersQuery::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = client()
            .attendance_logs(&session, &AttendanceLogsQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_invalid_query_rejected_before_network() {
        let session = Session::new("token", Role::Employee);
        let err = client()
            .attendance_history(&session, &AttendanceHistoryQuery::new("me"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
