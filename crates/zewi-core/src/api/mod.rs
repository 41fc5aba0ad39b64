//! Remote identity service boundary.
//!
//! This module provides the `AuthGateway` trait the session store talks to,
//! the `HttpAuthGateway` implementation for the zewi backend, and the
//! `ApiError` taxonomy shared by both.
//!
//! The backend authenticates with an HTTP-only session cookie set by the
//! login endpoint.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::HttpAuthGateway;
pub use error::ApiError;
pub use gateway::{AuthGateway, LoginResponse, ProfileResponse};
