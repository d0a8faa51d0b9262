//! REST API client module for the task backend.
//!
//! This module provides the `ApiClient` for the `/auth`, `/projects` and
//! `/tasks` endpoints. Data requests carry the JWT bearer token obtained
//! from `/auth/login` or `/auth/register`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ApiError, ErrorPayload};
