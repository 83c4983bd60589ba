//! Route handlers.
//!
//! - `POST /oauth/token` - password and client-credentials grants
//! - `PUT /Users/{id}/password` - password change, clears any lockout
//! - `GET /health` - liveness

use super::AppState;
use super::extract::{Form, Json as JsonBody};
use crate::auth::extractors::{AuthenticatedClient, Caller};
use crate::auth::flows::{
    AuthenticationGateway, PasswordChangeRequest, PasswordChangeResponse, TokenRequest,
};
use crate::error::Result;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Serialize;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/oauth/token", post(token))
        .route("/Users/{id}/password", put(change_password))
        .route("/health", get(health))
}

/// Token endpoint. The client authenticates with HTTP Basic.
async fn token(
    State(gateway): State<AuthenticationGateway>,
    AuthenticatedClient(client): AuthenticatedClient,
    Form(req): Form<TokenRequest>,
) -> Result<impl IntoResponse> {
    let issued = gateway.grant(&client, &req).await?;

    // Token responses must not be cached (RFC 6749 section 5.1)
    Ok((
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(issued),
    ))
}

/// Change a user's password.
///
/// Self-service callers must send `oldPassword`; administrative and
/// client-credential callers may omit it.
async fn change_password(
    State(gateway): State<AuthenticationGateway>,
    Path(id): Path<String>,
    Caller(caller): Caller,
    JsonBody(req): JsonBody<PasswordChangeRequest>,
) -> Result<Json<PasswordChangeResponse>> {
    gateway.change_password(&id, req, caller).await?;
    Ok(Json(PasswordChangeResponse::ok()))
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "healthy" })
}
