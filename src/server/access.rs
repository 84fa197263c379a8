//! Remote-address allow-list.

use super::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tracing::warn;

/// Reject requests from addresses not in the allow-list with an empty 403.
///
/// Runs before every route, so a rejected request never reaches a handler
/// and never touches the upload or output directories.
pub async fn require_allowed_ip(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if state.service().is_allowed(addr.ip()) {
        next.run(request).await
    } else {
        warn!("Forbidden: {} {} from {}", request.method(), request.uri().path(), addr.ip());
        StatusCode::FORBIDDEN.into_response()
    }
}
