//! HTTP service.
//!
//! | Route                  | Method   | Response                                 |
//! |------------------------|----------|------------------------------------------|
//! | `/`                    | GET      | upload page with the recent-files list   |
//! | `/`                    | POST     | convert `file` or `pasted_image`, page   |
//! | `/convert`             | POST     | convert `file`, `{"filename": ...}`      |
//! | `/download/:filename`  | GET      | converted file as an attachment          |
//! | `/last_files`          | GET      | `{"files": [...]}`                       |
//! | `/health`              | GET      | `{"status": "healthy", "version": ...}`  |
//!
//! Every route sits behind the allow-list in [`access`]. Conversions run
//! inside the request handler; the response is sent once the DOCX exists.
//!
//! The router reads the peer address through `ConnectInfo`, so serve it
//! with `into_make_service_with_connect_info::<SocketAddr>()`.

pub mod access;
pub mod error;
pub mod intake;
pub mod page;
pub mod routes;

use crate::config::{ConversionConfig, ServiceConfig};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use error::AppError;

/// Shared, immutable application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: ServiceConfig,
    conversion: ConversionConfig,
}

impl AppState {
    /// Documents are always written to `service.converted_dir`; the
    /// conversion config's `output_dir` is overridden to match.
    pub fn new(service: ServiceConfig, mut conversion: ConversionConfig) -> Self {
        conversion.output_dir = service.converted_dir.clone();
        if service.allowed_ips.is_empty() {
            warn!("Allow-list is empty: every request will be rejected with 403");
        }
        Self {
            inner: Arc::new(AppStateInner {
                service,
                conversion,
            }),
        }
    }

    pub fn service(&self) -> &ServiceConfig {
        &self.inner.service
    }

    pub fn conversion(&self) -> &ConversionConfig {
        &self.inner.conversion
    }
}

/// Build the router with every route, the allow-list and the body cap.
pub fn router(state: AppState) -> Router {
    let body_limit = match state.service().max_request_bytes {
        Some(max) => DefaultBodyLimit::max(max),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(routes::index).post(routes::upload))
        .route("/convert", post(routes::convert_api))
        .route("/download/:filename", get(routes::download))
        .route("/last_files", get(routes::last_files))
        .route("/health", get(routes::health))
        .layer(body_limit)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access::require_allowed_ip,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
