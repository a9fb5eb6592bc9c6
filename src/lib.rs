pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod punctuality;
pub mod session;

pub use error::{AppError, Result};
