//! Authentication module for managing the user's client-side session.
//!
//! This module provides:
//! - `SessionManager`: restore-on-start, register, sign-in and sign-out
//! - `AuthHandle`: shared access to the manager, with a guarded ambient scope
//! - `TokenStore`: durable storage for the credential token
//! - `decode_unverified`: display-only decoding of the token payload
//!
//! The persisted token is the only state that survives a restart.

pub mod manager;
pub mod scope;
pub mod storage;
pub mod token;

pub use manager::{AuthSnapshot, Session, SessionManager};
pub use scope::AuthHandle;
pub use storage::{
    open_store, FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY,
};
pub use token::{decode_unverified, TokenError, UnverifiedClaims};
