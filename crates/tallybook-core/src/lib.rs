//! Core library for tallybook.
//!
//! Owns the client-side authentication session: restoring it from durable
//! storage on startup, signing in and out against the remote auth service,
//! and publishing the current session to the rest of the application.

pub mod api;
pub mod auth;
pub mod config;

pub use api::{AuthClient, AuthError};
pub use auth::{AuthHandle, AuthSnapshot, Session, SessionManager};
pub use config::{Config, StorageBackend};
