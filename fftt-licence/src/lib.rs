//! fftt-licence library - licence lookup proxy
//!
//! Forwards `GET /licence/{id}` to the federation registry with a signed
//! query and answers with the player record as JSON.

use std::sync::Arc;

use axum::Router;
use fftt_common::RegistryClient;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

/// Application state shared across HTTP handlers
///
/// Everything inside is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Registry client holding the process session identifier
    pub registry: Arc<RegistryClient>,
}

impl AppState {
    pub fn new(registry: RegistryClient) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/licence/:licence_id", get(api::get_licence))
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
