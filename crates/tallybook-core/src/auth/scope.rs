//! Shared access to the session manager.
//!
//! The manager is built once at startup and handed to collaborators as an
//! `AuthHandle`. Code that cannot be handed one directly can run inside
//! `AuthHandle::scope` and fetch it with `AuthHandle::current`. Calling
//! `current` outside a scope is a wiring bug and panics.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use super::manager::SessionManager;

tokio::task_local! {
    static CURRENT: AuthHandle;
}

#[derive(Clone)]
pub struct AuthHandle {
    manager: Arc<SessionManager>,
}

impl AuthHandle {
    pub fn new(manager: SessionManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }

    /// Run `future` with this handle installed as the current scope
    pub async fn scope<F: Future>(&self, future: F) -> F::Output {
        CURRENT.scope(self.clone(), future).await
    }

    /// The handle of the enclosing scope.
    ///
    /// # Panics
    ///
    /// Panics when called outside `AuthHandle::scope`.
    #[track_caller]
    pub fn current() -> Self {
        match Self::try_current() {
            Some(handle) => handle,
            None => panic!("AuthHandle::current() must be called within an AuthHandle::scope"),
        }
    }

    pub fn try_current() -> Option<Self> {
        CURRENT.try_with(|handle| handle.clone()).ok()
    }
}

impl Deref for AuthHandle {
    type Target = SessionManager;

    fn deref(&self) -> &SessionManager {
        &self.manager
    }
}
