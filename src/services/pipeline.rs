//! Per-panel redaction pipeline: detect, decode, overlay, re-encode.
//!
//! Detection failures are returned to the caller. Decode or encode failures
//! after a successful detection fall back to the placeholder image and keep
//! the detected text.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::domain::panels::{PanelEntry, PanelRegistry, PanelSource, Redaction, Stage};
use crate::services::codec::{self, DecodeError, EncodeError, Placeholder};
use crate::services::detection::{BoundingBox, ClientError, DetectionClient, upload_file_name};
use crate::services::overlay::{self, OverlayMode};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Detection(#[from] ClientError),
    #[error("render task failed: {0}")]
    Render(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// True when the detection service could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, PipelineError::Detection(ClientError::Transport(_)))
    }
}

#[derive(Debug, thiserror::Error)]
enum CompositeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Decode, draw and re-encode as a PNG data URL. CPU-bound.
fn composite(data: &[u8], boxes: &[BoundingBox], mode: OverlayMode) -> Result<String, CompositeError> {
    let source = codec::decode(data)?;
    let rendered = overlay::render(&source, boxes, mode);
    Ok(codec::encode_png_data_url(&rendered)?)
}

#[derive(Debug, Clone)]
pub struct Redactor {
    client: DetectionClient,
    mode: OverlayMode,
    placeholder: Placeholder,
}

impl Redactor {
    pub fn new(client: DetectionClient, mode: OverlayMode, placeholder: Placeholder) -> Self {
        Self {
            client,
            mode,
            placeholder,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Fallback payload shown for panels that could not be redacted.
    pub fn placeholder(&self) -> &Placeholder {
        &self.placeholder
    }

    /// Run the full pipeline for one entry, tracking its stage.
    ///
    /// A successful run is stored on the entry. Unavailable sources answer
    /// with the placeholder without calling the detection service and leave
    /// the stored redaction alone.
    pub async fn redact_entry(&self, entry: &PanelEntry) -> Result<Redaction, PipelineError> {
        let panel = entry.panel();
        if panel.source == PanelSource::Unavailable {
            entry.set_stage(Stage::Failed);
            return Ok(self.placeholder_redaction());
        }

        entry.set_stage(Stage::Detecting);
        let data = match tokio::fs::read(&panel.file_path).await {
            Ok(data) => data,
            Err(source) => {
                entry.set_stage(Stage::Failed);
                return Err(ClientError::Read {
                    path: panel.file_path.clone(),
                    source,
                }
                .into());
            }
        };

        let detection = match self
            .client
            .detect_bytes(&upload_file_name(&panel.file_path), data.clone())
            .await
        {
            Ok(detection) => detection,
            Err(e) => {
                entry.set_stage(Stage::Failed);
                return Err(e.into());
            }
        };

        entry.set_stage(Stage::Rendering);
        let mode = self.mode;
        let boxes = detection.boxes;
        let rendered = tokio::task::spawn_blocking(move || composite(&data, &boxes, mode)).await;

        let image = match rendered {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => {
                log::warn!(
                    "[pipeline] Error rendering {}: {}; replacing with a filler",
                    panel.file_path.display(),
                    e
                );
                self.placeholder.as_str().to_string()
            }
            Err(e) => {
                entry.set_stage(Stage::Failed);
                return Err(e.into());
            }
        };

        let redaction = Redaction {
            image,
            text_lines: detection.text_lines,
        };
        entry.complete(redaction.clone());
        Ok(redaction)
    }

    fn placeholder_redaction(&self) -> Redaction {
        Redaction {
            image: self.placeholder.as_str().to_string(),
            text_lines: Vec::new(),
        }
    }
}

/// Redact every available panel before the server starts.
///
/// At most `concurrency` panels are in flight at once. Returns
/// `(processed, failed)`; failures are logged and leave the panel `Failed`.
pub async fn run_eager(
    registry: Arc<PanelRegistry>,
    redactor: Redactor,
    concurrency: usize,
) -> (usize, usize) {
    let mut processed = 0;
    let mut failed = 0;
    let mut next = 0;
    let mut tasks = JoinSet::new();

    loop {
        while tasks.len() < concurrency.max(1) && next < registry.len() {
            let index = next;
            next += 1;

            let registry = registry.clone();
            let redactor = redactor.clone();
            tasks.spawn(async move {
                let Some(entry) = registry.get(index) else {
                    return Err(());
                };
                if entry.panel().source == PanelSource::Unavailable {
                    entry.set_stage(Stage::Failed);
                    return Err(());
                }
                match redactor.redact_entry(entry).await {
                    Ok(_) => Ok(index),
                    Err(e) => {
                        log::error!(
                            "[eager] Failed to redact {}: {}",
                            entry.panel().file_path.display(),
                            e
                        );
                        Err(())
                    }
                }
            });
        }

        let Some(result) = tasks.join_next().await else {
            break;
        };

        match result {
            Ok(Ok(index)) => {
                log::debug!("[eager] Panel {} ready", index);
                processed += 1;
            }
            Ok(Err(())) => failed += 1,
            Err(e) => {
                log::error!("[eager] Task panicked: {}", e);
                failed += 1;
            }
        }
    }

    (processed, failed)
}
