use crate::error::LockwardError;
use axum::http::request::Parts;
use base64::{Engine, engine::general_purpose::STANDARD};

/// Client credentials presented with HTTP Basic authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Extracts credentials from the Authorization header
pub struct TokenExtractor;

impl TokenExtractor {
    /// Extract a bearer token
    pub fn bearer(parts: &Parts) -> Result<String, LockwardError> {
        let auth_header = authorization(parts)
            .ok_or_else(|| LockwardError::unauthorized("Full authentication is required"))?;

        let token = strip_scheme(auth_header, "Bearer").ok_or_else(|| {
            LockwardError::unauthorized(
                "Invalid authorization header format. Expected: Bearer <token>",
            )
        })?;

        if token.is_empty() {
            return Err(LockwardError::unauthorized("Empty bearer token"));
        }

        Ok(token.to_string())
    }

    /// Extract HTTP Basic client credentials.
    ///
    /// Both halves are form-urlencoded before base64 encoding, as OAuth2
    /// clients do, so they are decoded here.
    pub fn basic(parts: &Parts) -> Result<BasicCredentials, LockwardError> {
        let auth_header = authorization(parts)
            .ok_or_else(|| LockwardError::invalid_client("Client authentication is required"))?;

        let encoded = strip_scheme(auth_header, "Basic")
            .ok_or_else(|| LockwardError::invalid_client("Expected Basic client authentication"))?;

        let decoded = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| LockwardError::invalid_client("Malformed Basic credentials"))?;

        let (id, secret) = decoded
            .split_once(':')
            .ok_or_else(|| LockwardError::invalid_client("Malformed Basic credentials"))?;

        let unescape = |value: &str| {
            urlencoding::decode(&value.replace('+', " "))
                .map(|v| v.into_owned())
                .map_err(|_| LockwardError::invalid_client("Malformed Basic credentials"))
        };

        let client_id = unescape(id)?;
        if client_id.is_empty() {
            return Err(LockwardError::invalid_client("Missing client id"));
        }

        Ok(BasicCredentials {
            client_id,
            client_secret: unescape(secret)?,
        })
    }
}

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

// Scheme names are case-insensitive (RFC 7235)
fn strip_scheme<'a>(header: &'a str, scheme: &str) -> Option<&'a str> {
    let (name, rest) = header.split_once(' ')?;
    name.eq_ignore_ascii_case(scheme).then(|| rest.trim())
}
