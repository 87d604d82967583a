//! Panels discovered in the source directory and their redaction state.
//!
//! The registry is built once at startup and shared read-only with request
//! handlers. Each entry guards its own mutable state, so requests for
//! different panels never contend.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::services::codec::{self, Placeholder, SourceFormat};
use crate::services::detection::join_lines;

/// Whether a panel's source image can be fed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSource {
    Available(SourceFormat),
    /// Unreadable or undecodable; only the placeholder is ever served.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub file_path: PathBuf,
    pub source: PanelSource,
    /// Data URL of the untouched file, or the placeholder payload.
    pub original_image: String,
}

impl Panel {
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Redacted image and detected text, always produced together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    pub image: String,
    pub text_lines: Vec<String>,
}

impl Redaction {
    pub fn detected_text(&self) -> String {
        join_lines(&self.text_lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Registered,
    Detecting,
    Rendering,
    Ready,
    Failed,
}

#[derive(Debug)]
struct PanelState {
    stage: Stage,
    redaction: Option<Redaction>,
}

#[derive(Debug)]
pub struct PanelEntry {
    panel: Panel,
    state: Mutex<PanelState>,
}

impl PanelEntry {
    fn new(panel: Panel) -> Self {
        Self {
            panel,
            state: Mutex::new(PanelState {
                stage: Stage::Registered,
                redaction: None,
            }),
        }
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn stage(&self) -> Stage {
        self.lock().stage
    }

    /// Last successful redaction, if any.
    pub fn redaction(&self) -> Option<Redaction> {
        self.lock().redaction.clone()
    }

    pub fn set_stage(&self, stage: Stage) {
        self.lock().stage = stage;
    }

    /// Store a finished redaction and mark the panel ready.
    pub fn complete(&self, redaction: Redaction) {
        let mut state = self.lock();
        state.stage = Stage::Ready;
        state.redaction = Some(redaction);
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        // State is plain data, a poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Default)]
pub struct PanelRegistry {
    entries: Vec<PanelEntry>,
}

impl PanelRegistry {
    pub fn new(panels: Vec<Panel>) -> Self {
        Self {
            entries: panels.into_iter().map(PanelEntry::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PanelEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PanelEntry> {
        self.entries.iter()
    }
}

/// List `dir` in name order and build one panel per PNG/JPEG file.
///
/// Files that cannot be read or decoded still get a panel, carrying the
/// placeholder instead of their content. Listing failures are returned.
pub fn scan_directory(dir: &Path, placeholder: &Placeholder) -> std::io::Result<Vec<Panel>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        if let Some(format) = SourceFormat::from_path(&path) {
            files.push((path, format));
        }
    }
    files.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));

    let panels = files
        .into_iter()
        .map(|(path, format)| load_panel(path, format, placeholder))
        .collect();

    Ok(panels)
}

fn load_panel(file_path: PathBuf, format: SourceFormat, placeholder: &Placeholder) -> Panel {
    let data = match std::fs::read(&file_path) {
        Ok(data) => data,
        Err(e) => {
            log::warn!(
                "[scan] Error reading {}: {}; replacing with a filler",
                file_path.display(),
                e
            );
            return unavailable(file_path, placeholder);
        }
    };

    if let Err(e) = codec::decode(&data) {
        log::warn!(
            "[scan] Error decoding {}: {}; replacing with a filler",
            file_path.display(),
            e
        );
        return unavailable(file_path, placeholder);
    }

    Panel {
        original_image: codec::encode_data_url(&data, format.mime_subtype()),
        source: PanelSource::Available(format),
        file_path,
    }
}

fn unavailable(file_path: PathBuf, placeholder: &Placeholder) -> Panel {
    Panel {
        file_path,
        source: PanelSource::Unavailable,
        original_image: placeholder.as_str().to_string(),
    }
}
