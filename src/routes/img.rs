//! Per-panel redaction endpoint (/img)

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::config::Processing;
use crate::services::error::LogErr;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/img", get(get_img))
        .route("/img/", get(get_img))
}

#[derive(Deserialize)]
struct ImgQuery {
    #[serde(rename = "panelIndex")]
    panel_index: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImgResponse {
    #[serde(rename = "RedactedImageBase64")]
    pub redacted_image_base64: String,
    #[serde(rename = "DetectedText")]
    pub detected_text: String,
}

/// GET /img?panelIndex=N - Redact one panel and return image plus text
async fn get_img(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImgQuery>,
) -> Result<Json<ImgResponse>, StatusCode> {
    let raw = query.panel_index.ok_or_else(|| {
        log::warn!("[img] No panelIndex parameter passed");
        StatusCode::BAD_REQUEST
    })?;
    let index: usize = raw
        .trim()
        .parse()
        .log_400(&format!("[img] Invalid panelIndex {:?}", raw))?;

    let entry = state.registry.get(index).ok_or_else(|| {
        log::warn!(
            "[img] panelIndex {} out of range ({} panels)",
            index,
            state.registry.len()
        );
        StatusCode::NOT_FOUND
    })?;

    let Some(redactor) = &state.redactor else {
        return Ok(Json(ImgResponse {
            redacted_image_base64: entry.panel().original_image.clone(),
            detected_text: String::new(),
        }));
    };

    if state.processing == Processing::Eager
        && let Some(redaction) = entry.redaction()
    {
        return Ok(Json(ImgResponse {
            detected_text: redaction.detected_text(),
            redacted_image_base64: redaction.image,
        }));
    }

    let file_path = entry.panel().file_path.display().to_string();
    let redaction = redactor
        .redact_entry(entry)
        .await
        .inspect_err(|e| {
            if e.is_transport() {
                log::error!(
                    "[img] Perhaps the detection service isn't running at {}?",
                    redactor.endpoint()
                );
            }
        })
        .log_502(&format!("[img] Error redacting {}", file_path))?;

    Ok(Json(ImgResponse {
        detected_text: redaction.detected_text(),
        redacted_image_base64: redaction.image,
    }))
}
