//! Client for the remote authentication service.
//!
//! This module provides the `AuthClient` struct for the two credential
//! exchanges the session manager needs: account registration and login.
//! Nothing here touches local state.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{INVALID_CREDENTIALS_MESSAGE, REGISTER_FAILED_MESSAGE};
use super::AuthError;

// ============================================================================
// Constants
// ============================================================================

/// Path of the registration endpoint, relative to the base URL
const REGISTER_PATH: &str = "/api/auth/register";

/// Path of the login endpoint, relative to the base URL
const LOGIN_PATH: &str = "/api/auth/login";

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Error body the service sends alongside non-success statuses
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Login body; every field is optional because the same shape carries
/// both the success and the failure case.
#[derive(Debug, Default, Deserialize)]
struct LoginBody {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<LoginUser>,
    #[serde(default)]
    message: Option<String>,
}

/// User object embedded in a successful login response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
}

/// A successful login: the issued token and the user it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

/// Client for the auth service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    /// Create a client for the service at `base_url`.
    ///
    /// No request timeout is applied unless one is given; a hung service
    /// leaves the call pending until the caller gives up on it.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_credentials(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<Response, AuthError> {
        let url = self.url(path);
        debug!(%url, "Sending credentials request");

        let response = self
            .client
            .post(&url)
            .json(&CredentialsRequest { email, password })
            .send()
            .await?;

        Ok(response)
    }

    /// Read and parse a JSON body; an unreadable body is a transport failure
    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, AuthError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::transport(format!("Invalid response body: {}", e)))
    }

    /// Create an account. Never issues a token.
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let response = self.post_credentials(REGISTER_PATH, email, password).await?;
        let status = response.status();

        if status.is_success() {
            debug!(%status, "Registration accepted");
            return Ok(());
        }

        let body: ErrorBody = Self::read_json(response).await?;
        warn!(%status, message = ?body.message, "Registration rejected");
        Err(AuthError::rejected(body.message.as_deref(), REGISTER_FAILED_MESSAGE))
    }

    /// Exchange credentials for a token.
    ///
    /// The body is parsed as JSON whatever the status, since the service
    /// reports failures in a JSON body too.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let response = self.post_credentials(LOGIN_PATH, email, password).await?;
        let status = response.status();
        let body: LoginBody = Self::read_json(response).await?;

        Self::interpret_login(status, body)
    }

    fn interpret_login(status: StatusCode, body: LoginBody) -> Result<LoginResponse, AuthError> {
        let token = body.token.filter(|t| !t.is_empty());

        let token = match token {
            Some(token) if status.is_success() => token,
            _ => {
                warn!(%status, message = ?body.message, "Login rejected");
                return Err(AuthError::rejected(
                    body.message.as_deref(),
                    INVALID_CREDENTIALS_MESSAGE,
                ));
            }
        };

        let user = body
            .user
            .ok_or_else(|| AuthError::transport("Login response is missing the user object"))?;

        debug!(user_id = %user.id, "Login accepted");
        Ok(LoginResponse { token, user })
    }
}
