//! HTTP client module for the remote authentication service.
//!
//! This module provides the `AuthClient` for the register and login
//! endpoints, and the `AuthError` taxonomy returned to collaborators.
//!
//! The service issues JWT-shaped bearer tokens; verifying them is the
//! service's job, not ours.

pub mod client;
pub mod error;

pub use client::{AuthClient, LoginResponse, LoginUser};
pub use error::AuthError;
