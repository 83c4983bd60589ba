//! HTTP surface: shared state, router and middleware stack.

mod extract;
mod routes;

pub use extract::{Form, Json};

use crate::auth::clients::ClientRegistry;
use crate::auth::flows::AuthenticationGateway;
use axum::{Router, extract::DefaultBodyLimit, extract::FromRef};
use std::sync::Arc;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;

/// State shared by all handlers.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub gateway: AuthenticationGateway,
    pub clients: Arc<ClientRegistry>,
}

impl AppState {
    pub fn new(gateway: AuthenticationGateway, clients: ClientRegistry) -> Self {
        Self {
            gateway,
            clients: Arc::new(clients),
        }
    }
}

/// Build the router with its middleware stack applied.
pub fn router(state: AppState, max_body_size: usize) -> Router {
    // Layers run outermost-last: request ids are assigned before tracing sees the request
    routes::routes()
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Assigns a UUID v4 `x-request-id` to requests that lack one
#[derive(Clone, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let request_id = uuid::Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(request_id))
    }
}
