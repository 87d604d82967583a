//! Image directory preview with detection-service redaction overlays.

pub mod config;
pub mod constants;
pub mod domain;
pub mod logging;
pub mod routes;
pub mod services;

use axum::Router;
use std::sync::Arc;

use config::Processing;
use domain::panels::PanelRegistry;
use services::pipeline::Redactor;

/// State shared by every request handler.
pub struct AppState {
    pub registry: Arc<PanelRegistry>,
    /// `None` when redaction is disabled.
    pub redactor: Option<Redactor>,
    pub processing: Processing,
}

/// Build the router serving the index page and per-panel redactions.
pub fn build_app(state: Arc<AppState>) -> Router {
    routes::build_routes().with_state(state)
}
