use crate::auth::caller::CallerContext;
use crate::auth::clients::{ClientRegistry, RegisteredClient};
use crate::auth::flows::AuthenticationGateway;
use crate::auth::token::TokenExtractor;
use crate::error::LockwardError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::sync::Arc;

/// Axum extractor for the authenticated caller
///
/// Verifies the bearer token through the gateway's token service. The
/// request is rejected with 401 if the token is missing or invalid.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Caller(caller): Caller) -> String {
///     format!("Called by {}", caller.subject)
/// }
/// ```
pub struct Caller(pub CallerContext);

impl<S> FromRequestParts<S> for Caller
where
    AuthenticationGateway: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = LockwardError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gateway = AuthenticationGateway::from_ref(state);
        let token = TokenExtractor::bearer(parts)?;
        Ok(Caller(gateway.caller(&token)?))
    }
}

/// Axum extractor for a client authenticated with HTTP Basic
///
/// Rejects with 401 `invalid_client` if the credentials are missing or do
/// not match a registered client.
pub struct AuthenticatedClient(pub RegisteredClient);

impl<S> FromRequestParts<S> for AuthenticatedClient
where
    Arc<ClientRegistry>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = LockwardError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let registry = Arc::<ClientRegistry>::from_ref(state);
        let credentials = TokenExtractor::basic(parts)?;
        let client = registry.authenticate(&credentials)?.clone();
        Ok(AuthenticatedClient(client))
    }
}
