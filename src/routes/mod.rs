pub mod img;
pub mod index;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::AppState;

/// Build all routes for the preview server
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(index::routes())
        .merge(img::routes())
}

async fn health() -> &'static str {
    "ok"
}
