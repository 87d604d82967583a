//! Index page (/) listing every panel

use axum::{Router, extract::State, response::Html, routing::get};
use std::fmt::Write;
use std::sync::Arc;

use crate::AppState;
use crate::config::Processing;
use crate::domain::panels::PanelEntry;
use crate::services::pipeline::Redactor;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(index))
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(&state))
}

/// Escape text for use in element content and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_index(state: &AppState) -> String {
    let redactor = state.redactor.as_ref();
    let lazy = redactor.is_some() && state.processing == Processing::Lazy;

    let mut rows = String::new();
    for (index, entry) in state.registry.iter().enumerate() {
        render_panel(&mut rows, index, entry, redactor, lazy);
    }
    if state.registry.is_empty() {
        rows.push_str("<p class=\"empty\">No PNG or JPEG images found.</p>\n");
    }

    let script = if lazy { LAZY_SCRIPT } else { "" };

    format!(
        r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Redaction preview</title>
    <style>
      body {{ margin: 1.5rem; font-family: ui-sans-serif, system-ui, sans-serif; }}
      .panel {{ display: flex; gap: 1rem; align-items: flex-start; padding: 1rem 0; border-bottom: 1px solid #ddd; }}
      .panel figure {{ margin: 0; flex: 1; }}
      .panel img {{ max-width: 100%; }}
      .panel pre {{ flex: 1; white-space: pre-wrap; }}
    </style>
  </head>
  <body>
    <h1>Redaction preview</h1>
{rows}{script}  </body>
</html>
"##
    )
}

fn render_panel(
    out: &mut String,
    index: usize,
    entry: &PanelEntry,
    redactor: Option<&Redactor>,
    lazy: bool,
) {
    let panel = entry.panel();
    let name = escape_html(&panel.file_path.display().to_string());
    let original = escape_html(&panel.original_image);

    let _ = writeln!(
        out,
        "    <section class=\"panel\" data-panel-index=\"{index}\">\n      \
         <figure><img src=\"{original}\" alt=\"{name}\" /><figcaption>{name}</figcaption></figure>"
    );

    if let Some(redactor) = redactor {
        let (image, text) = if lazy {
            (String::new(), "Detecting text...".to_string())
        } else {
            match entry.redaction() {
                Some(redaction) => (escape_html(&redaction.image), escape_html(&redaction.detected_text())),
                None => (
                    escape_html(redactor.placeholder().as_str()),
                    "Redaction unavailable".to_string(),
                ),
            }
        };
        let _ = writeln!(
            out,
            "      <figure><img class=\"redacted\" src=\"{image}\" alt=\"redacted {name}\" /></figure>\n      \
             <pre class=\"text\">{text}</pre>"
        );
    }

    out.push_str("    </section>\n");
}

const LAZY_SCRIPT: &str = r#"    <script>
      document.querySelectorAll(".panel").forEach(async (panel) => {
        const text = panel.querySelector(".text");
        try {
          const resp = await fetch("/img?panelIndex=" + panel.dataset.panelIndex);
          if (!resp.ok) throw new Error("status " + resp.status);
          const data = await resp.json();
          panel.querySelector(".redacted").src = data.RedactedImageBase64;
          text.textContent = data.DetectedText;
        } catch (err) {
          text.textContent = "Redaction failed (" + err.message + ")";
        }
      });
    </script>
"#;
