use thiserror::Error;

/// Fallback message when registration is rejected without a reason
pub const REGISTER_FAILED_MESSAGE: &str = "Failed to register";

/// Fallback message when login is rejected without a reason
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

/// Fallback message when a transport failure has no description
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// Maximum length for transport descriptions kept in an error
const MAX_MESSAGE_LENGTH: usize = 500;

/// Recoverable failures of the network-mediated session operations.
///
/// Both kinds are returned as ordinary values so a caller can render inline
/// feedback; neither indicates a bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The service understood the request and refused it.
    #[error("{0}")]
    ServiceRejected(String),

    /// The exchange could not complete or the response was unreadable.
    #[error("{0}")]
    Transport(String),

    /// The token was issued but could not be persisted locally.
    #[error("Failed to persist session: {0}")]
    Storage(String),
}

impl AuthError {
    /// Truncate a message to avoid carrying excessive data around
    fn truncate(message: &str) -> String {
        if message.len() <= MAX_MESSAGE_LENGTH {
            return message.to_string();
        }
        let mut end = MAX_MESSAGE_LENGTH;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &message[..end], message.len())
    }

    /// Build a rejection carrying the service message verbatim, or the given
    /// fallback when the message is missing or empty.
    pub fn rejected(message: Option<&str>, fallback: &str) -> Self {
        match message.filter(|m| !m.is_empty()) {
            Some(m) => AuthError::ServiceRejected(m.to_string()),
            None => AuthError::ServiceRejected(fallback.to_string()),
        }
    }

    /// Build a transport failure from a lower-level description
    pub fn transport(description: impl AsRef<str>) -> Self {
        let description = description.as_ref().trim();
        if description.is_empty() {
            AuthError::Transport(NETWORK_ERROR_MESSAGE.to_string())
        } else {
            AuthError::Transport(Self::truncate(description))
        }
    }

    /// The user-facing message carried by this error
    pub fn message(&self) -> &str {
        match self {
            AuthError::ServiceRejected(m) | AuthError::Transport(m) | AuthError::Storage(m) => m,
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::ServiceRejected(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_uses_service_message() {
        let err = AuthError::rejected(Some("bad creds"), INVALID_CREDENTIALS_MESSAGE);
        assert_eq!(err, AuthError::ServiceRejected("bad creds".to_string()));
        assert_eq!(err.to_string(), "bad creds");
    }

    #[test]
    fn test_rejected_falls_back_when_missing_or_empty() {
        assert_eq!(
            AuthError::rejected(None, REGISTER_FAILED_MESSAGE).message(),
            "Failed to register"
        );
        assert_eq!(
            AuthError::rejected(Some(""), INVALID_CREDENTIALS_MESSAGE).message(),
            "Invalid credentials"
        );
    }

    #[test]
    fn test_rejected_keeps_message_verbatim() {
        let err = AuthError::rejected(Some("  bad creds  "), INVALID_CREDENTIALS_MESSAGE);
        assert_eq!(err.message(), "  bad creds  ");

        let err = AuthError::rejected(Some("   "), INVALID_CREDENTIALS_MESSAGE);
        assert_eq!(err.message(), "   ");
    }

    #[test]
    fn test_transport_fallback() {
        assert_eq!(AuthError::transport("").message(), "Network error");
        assert_eq!(
            AuthError::transport("connection refused").message(),
            "connection refused"
        );
    }

    #[test]
    fn test_long_rejection_is_not_truncated() {
        let long = "x".repeat(MAX_MESSAGE_LENGTH + 20);
        let err = AuthError::rejected(Some(&long), INVALID_CREDENTIALS_MESSAGE);
        assert_eq!(err.message(), long);
        assert!(err.is_rejection());
    }

    #[test]
    fn test_long_transport_description_is_truncated() {
        let long = "x".repeat(MAX_MESSAGE_LENGTH + 20);
        let err = AuthError::transport(&long);
        assert!(err.message().starts_with(&"x".repeat(MAX_MESSAGE_LENGTH)));
        assert!(err.message().contains("truncated"));
    }
}
