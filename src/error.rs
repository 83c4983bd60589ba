use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for lockward
#[derive(Debug, thiserror::Error)]
pub enum LockwardError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid client: {0}")]
    InvalidClient(String),

    #[error("Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// OAuth2-shaped error body.
///
/// `error` is a stable machine-readable code, `error_description` carries the
/// human-readable reason (for example `"Login policy rejected authentication"`).
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub error_description: String,
    pub error_id: String,
}

impl LockwardError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn invalid_client(msg: impl Into<String>) -> Self {
        Self::InvalidClient(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::UnsupportedGrantType(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) | Self::InvalidClient(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// OAuth2 error code for the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "invalid_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "access_denied",
            Self::InvalidClient(_) => "invalid_client",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::Internal(_) => "server_error",
        }
    }

    /// The reason sent to clients.
    ///
    /// Client errors (4xx) expose their message as-is. Server errors return a
    /// generic message; the detail is only written to the server log (CWE-209).
    pub fn description(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::InvalidClient(msg)
            | Self::UnsupportedGrantType(msg) => msg.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for LockwardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request failed"
            );
        } else {
            tracing::debug!(
                status = status.as_u16(),
                error_id = %error_id,
                error = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: self.error_code(),
            error_description: self.description(),
            error_id,
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::InvalidClient(_)) {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Basic realm=\"oauth\""),
            );
        }
        response
    }
}

/// Result type alias for lockward operations
pub type Result<T> = std::result::Result<T, LockwardError>;

impl From<serde_json::Error> for LockwardError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            LockwardError::BadRequest(format!("JSON error: {}", err))
        } else {
            LockwardError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

impl From<jsonwebtoken::errors::Error> for LockwardError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => LockwardError::Unauthorized("Token has expired".into()),
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::ImmatureSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => LockwardError::Unauthorized("Invalid token".into()),
            _ => LockwardError::Internal(format!("Token processing failed: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LockwardError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LockwardError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LockwardError::invalid_client("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LockwardError::forbidden("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LockwardError::UnsupportedGrantType("implicit".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = LockwardError::internal("connection string leaked");
        assert_eq!(err.description(), "Internal server error");

        let err = LockwardError::unauthorized("Login policy rejected authentication");
        assert_eq!(err.description(), "Login policy rejected authentication");
    }

    #[tokio::test]
    async fn test_response_body_is_oauth_shaped() {
        let response =
            LockwardError::unauthorized("Login policy rejected authentication").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(
            body["error_description"],
            "Login policy rejected authentication"
        );
        assert!(body["error_id"].is_string());
    }

    #[test]
    fn test_invalid_client_sets_www_authenticate() {
        let response = LockwardError::invalid_client("Bad client credentials").into_response();
        assert!(
            response
                .headers()
                .contains_key(axum::http::header::WWW_AUTHENTICATE)
        );
    }
}
