use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use redact_preview::config::{Args, Config, Processing, RedactMode};
use redact_preview::domain::panels::{PanelRegistry, scan_directory};
use redact_preview::services::codec::Placeholder;
use redact_preview::services::detection::DetectionClient;
use redact_preview::services::pipeline::{Redactor, run_eager};
use redact_preview::{AppState, build_app, logging};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    // Validate flags before touching the directory, the network or the port.
    let config = match Config::try_from(Args::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Oops, {}", e);
            eprintln!("Exiting...");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("[server] {}", e);
            eprintln!("Exiting...");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), BoxError> {
    let placeholder = Placeholder::load(&config.placeholder_path);

    let directory = config.directory.clone();
    let scan_placeholder = placeholder.clone();
    let panels = tokio::task::spawn_blocking(move || scan_directory(&directory, &scan_placeholder))
        .await?
        .map_err(|e| {
            format!(
                "error reading directory {}: {}. Maybe I don't have the right permissions?",
                config.directory.display(),
                e
            )
        })?;
    log::info!(
        "[scan] Found {} image(s) in {}",
        panels.len(),
        config.directory.display()
    );
    let registry = Arc::new(PanelRegistry::new(panels));

    let redactor = match config.redact_mode {
        RedactMode::Disabled => None,
        RedactMode::Overlay(mode) => {
            let client = DetectionClient::new(&config.detection_address, config.detect_timeout)?;
            Some(Redactor::new(client, mode, placeholder))
        }
    };

    if let (Processing::Eager, Some(redactor)) = (config.processing, &redactor) {
        let (processed, failed) =
            run_eager(registry.clone(), redactor.clone(), config.eager_concurrency).await;
        log::info!(
            "[eager] Startup pass complete: {} redacted, {} failed",
            processed,
            failed
        );
    }

    let state = Arc::new(AppState {
        registry,
        redactor,
        processing: config.processing,
    });
    let app = build_app(state);

    let addr = format!("0.0.0.0:{}", config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("failed to bind {}: {}", addr, e))?;

    log::info!("[server] Successfully initialized");
    log::info!("[server] Listening at http://localhost:{}", config.listen_port);

    axum::serve(listener, app).await?;
    Ok(())
}
