//! Client for the external text-detection service.
//!
//! One image goes out as a multipart form with a single `file` field; the
//! reply is a JSON object with exactly two keys, `boxes` and `text`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, StatusCode, multipart};
use serde::Deserialize;

use crate::constants::DETECTION_FIELD_NAME;

/// Errors raised while talking to the detection service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Axis-aligned box in image pixel space, origin top-left.
///
/// Coordinates are taken verbatim from the service and may fall outside the
/// image or be inverted; the overlay renderer clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [i64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// Parsed reply of one detection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    pub boxes: Vec<BoundingBox>,
    pub text_lines: Vec<String>,
}

impl DetectionResult {
    /// Every line followed by a newline, in service order.
    pub fn detected_text(&self) -> String {
        join_lines(&self.text_lines)
    }
}

pub fn join_lines(lines: &[String]) -> String {
    let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetectionResponse {
    boxes: Vec<[i64; 4]>,
    text: Vec<String>,
}

/// Parse a response body against the strict `{boxes, text}` schema.
pub fn parse_response(body: &[u8]) -> Result<DetectionResult, ClientError> {
    let response: DetectionResponse = serde_json::from_slice(body)
        .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

    Ok(DetectionResult {
        boxes: response.boxes.into_iter().map(BoundingBox::from).collect(),
        text_lines: response.text,
    })
}

#[derive(Debug, Clone)]
pub struct DetectionClient {
    endpoint: String,
    http: Client,
}

impl DetectionClient {
    /// Create a client posting to `endpoint`. Every call is bounded by `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Read the image at `path` and send it for detection.
    pub async fn detect(&self, path: &Path) -> Result<DetectionResult, ClientError> {
        let data = tokio::fs::read(path).await.map_err(|source| ClientError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.detect_bytes(&upload_file_name(path), data).await
    }

    /// Send already-loaded image bytes for detection.
    pub async fn detect_bytes(
        &self,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<DetectionResult, ClientError> {
        let part = multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new()
            .percent_encode_noop()
            .part(DETECTION_FIELD_NAME, part);

        // The form sets the multipart Content-Type including its boundary.
        let response = self.http.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        parse_response(&body)
    }
}

/// Base name of the path, as sent in the multipart `filename` attribute.
pub fn upload_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}
