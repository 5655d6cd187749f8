//! REST API client module for the internship backend.
//!
//! This module provides the `ApiClient` for task, stage, comment, team and
//! user operations, and the `Gateway` every authenticated call goes through.
//!
//! The backend uses JWT bearer tokens: a short-lived access token and a
//! refresh token exchanged at `token/refresh/` when the access token is
//! rejected.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::{ApiClient, Registration};
pub use error::ApiError;
pub use gateway::{ApiRequest, Gateway};
