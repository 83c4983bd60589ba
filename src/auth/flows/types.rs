//! Request and response types for authentication flows.

use serde::{Deserialize, Serialize};

/// Password change request body.
///
/// The target principal comes from the request path, not the body.
#[derive(Clone, Deserialize, Serialize)]
pub struct PasswordChangeRequest {
    /// The new password.
    pub password: String,
    /// Current password. Required for self-service changes, ignored otherwise.
    #[serde(
        rename = "oldPassword",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub old_password: Option<String>,
}

impl PasswordChangeRequest {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            old_password: None,
        }
    }

    #[must_use]
    pub fn with_old_password(mut self, old_password: impl Into<String>) -> Self {
        self.old_password = Some(old_password.into());
        self
    }
}

// Keep credentials out of logs
impl std::fmt::Debug for PasswordChangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordChangeRequest")
            .field("password", &"<redacted>")
            .field("old_password", &self.old_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Form body of `POST /oauth/token`.
#[derive(Clone, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Space-separated scope. Narrows the client's scope when present.
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("scope", &self.scope)
            .finish()
    }
}

/// Response of a successful password change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordChangeResponse {
    pub status: String,
    pub message: String,
}

impl PasswordChangeResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "password updated".to_string(),
        }
    }
}
