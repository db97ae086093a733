//! Session state and the transitions that change it.
//!
//! The manager starts out `loading` with no session. `restore` runs once,
//! locally, and settles `loading` to false. `register`, `sign_in` and
//! `sign_out` go through a single async lock, so overlapping calls complete
//! one after another in the order they were made.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::api::{AuthClient, AuthError, LoginUser};

use super::storage::{TokenStore, TOKEN_KEY};
use super::token::{decode_unverified, UnverifiedClaims};

/// The authenticated identity active in this process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

impl From<LoginUser> for Session {
    fn from(user: LoginUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
        }
    }
}

impl From<UnverifiedClaims> for Session {
    fn from(claims: UnverifiedClaims) -> Self {
        Self {
            user_id: claims.id,
            email: claims.email,
        }
    }
}

/// What collaborators observe: the session (if any) and whether the
/// startup restore is still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    pub loading: bool,
}

impl AuthSnapshot {
    fn initial() -> Self {
        Self {
            session: None,
            loading: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

pub struct SessionManager {
    client: AuthClient,
    store: Box<dyn TokenStore>,
    state: watch::Sender<AuthSnapshot>,
    restored: AtomicBool,
    /// Set once sign-in or sign-out has published a session
    transitioned: AtomicBool,
    transitions: Mutex<()>,
}

impl SessionManager {
    pub fn new(client: AuthClient, store: Box<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::initial());
        Self {
            client,
            store,
            state,
            restored: AtomicBool::new(false),
            transitioned: AtomicBool::new(false),
            transitions: Mutex::new(()),
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Receive every replacement of the snapshot
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// Claims carried by the persisted token, for display only.
    ///
    /// Nothing here is verified; do not use it to decide access.
    pub fn token_claims(&self) -> Option<UnverifiedClaims> {
        let token = self.store.get(TOKEN_KEY).ok().flatten()?;
        decode_unverified(&token).ok()
    }

    fn publish_session(&self, session: Option<Session>) {
        self.transitioned.store(true, Ordering::SeqCst);
        self.state.send_modify(|snapshot| snapshot.session = session);
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Recover the previous session from the persisted token.
    ///
    /// Runs once per manager; later calls only return the current snapshot.
    /// No network I/O. A token that cannot be decoded is left in storage and
    /// treated as no session. A session already set by `sign_in` or
    /// `sign_out` is kept; only `loading` changes then.
    pub fn restore(&self) -> AuthSnapshot {
        if self.restored.swap(true, Ordering::SeqCst) {
            debug!("Session already restored");
            return self.snapshot();
        }

        let session = match self.store.get(TOKEN_KEY) {
            Ok(Some(token)) => match decode_unverified(&token) {
                Ok(claims) => {
                    debug!(user_id = %claims.id, expired = claims.is_expired(), "Session restored from token");
                    Some(Session::from(claims))
                }
                Err(e) => {
                    debug!(error = %e, "Stored token could not be decoded");
                    None
                }
            },
            Ok(None) => {
                debug!("No stored token");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        };

        self.state.send_modify(|snapshot| {
            if self.transitioned.load(Ordering::SeqCst) {
                debug!("Session changed before restore finished, keeping it");
            } else {
                snapshot.session = session;
            }
            snapshot.loading = false;
        });
        self.snapshot()
    }

    /// Create an account. Never signs the user in.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let _guard = self.transitions.lock().await;
        self.client.register(email, password).await?;
        info!("Registration succeeded");
        Ok(())
    }

    /// Sign in and persist the issued token.
    ///
    /// The token is written to storage before the in-memory session changes.
    /// On any failure nothing is mutated.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let _guard = self.transitions.lock().await;
        let login = self.client.login(email, password).await?;

        self.store.set(TOKEN_KEY, &login.token).map_err(|e| {
            warn!(error = %e, "Failed to persist token");
            AuthError::Storage(e.to_string())
        })?;

        let session = Session::from(login.user);
        info!(user_id = %session.user_id, "Signed in");
        self.publish_session(Some(session));
        Ok(())
    }

    /// Drop the persisted token and the in-memory session. Idempotent.
    pub async fn sign_out(&self) {
        let _guard = self.transitions.lock().await;

        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!(error = %e, "Failed to remove stored token");
        }

        if self.is_authenticated() {
            info!("Signed out");
        }
        self.publish_session(None);
    }
}

// ============================================================================
// Tests
// ============================================================================
