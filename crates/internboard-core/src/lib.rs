//! Core library for internboard.
//!
//! Provides the authenticated API client for the internship scheduler
//! backend, the session credential store, data models and the work timer.
//! Front ends (the `internboard` CLI) build on these.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod timer;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::SessionStore;
pub use config::Config;
pub use timer::{GuardPolicy, TimerError, WorkTimer};
