//! Data models for attendance, departments, users, and authentication.

pub mod attendance;
pub mod auth;
pub mod common;
pub mod department;
pub mod user;

pub use attendance::{AttendanceRecord, AttendanceResponse, ClockStatus, CurrentStatusResponse, Direction};
pub use auth::{Role, Session};
pub use common::{ApiResponse, PageQuery, Pagination};
pub use department::{AssignDepartment, CreateDepartment, Department, UpdateDepartment};
pub use user::{Profile, UpdateProfile, User};
