//! Command line and environment configuration.
//!
//! `Config::try_from(Args)` does all validation up front, before the
//! directory is read or the listener is bound.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::constants::{
    DEFAULT_DETECT_TIMEOUT_SECS, DEFAULT_DETECTION_ADDRESS, DEFAULT_EAGER_CONCURRENCY,
    DEFAULT_LISTEN_PORT, DEFAULT_PLACEHOLDER_PATH,
};
use crate::services::overlay::OverlayMode;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "redact-preview",
    version,
    about = "Preview a directory of images with detected text outlined or boxed out"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short = 'l', long, env = "REDACT_PREVIEW_PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,

    /// Directory containing the images to be processed
    #[arg(short = 'd', long, env = "REDACT_PREVIEW_DIR", default_value = ".")]
    pub directory: PathBuf,

    /// Address of the detection service, including the http:// scheme
    #[arg(short = 'a', long, env = "REDACT_PREVIEW_DETECTION_ADDRESS", default_value = DEFAULT_DETECTION_ADDRESS)]
    pub address: String,

    /// Skip detection and show the images unredacted
    #[arg(long, env = "REDACT_PREVIEW_NOREDACT")]
    pub noredact: bool,

    /// Cover detected text with a solid red box instead of an outline
    #[arg(long, env = "REDACT_PREVIEW_BOXREDACT")]
    pub boxredact: bool,

    /// Redact every image at startup instead of on request
    #[arg(long, env = "REDACT_PREVIEW_EAGER")]
    pub eager: bool,

    /// File whose contents replace images that cannot be read or decoded
    #[arg(long, env = "REDACT_PREVIEW_PLACEHOLDER", default_value = DEFAULT_PLACEHOLDER_PATH)]
    pub placeholder: PathBuf,

    /// Timeout for one call to the detection service, in seconds
    #[arg(long, env = "REDACT_PREVIEW_DETECT_TIMEOUT_SECS", default_value_t = DEFAULT_DETECT_TIMEOUT_SECS)]
    pub detect_timeout_secs: u64,

    /// Images redacted in parallel during the startup pass
    #[arg(long, env = "REDACT_PREVIEW_EAGER_CONCURRENCY", default_value_t = DEFAULT_EAGER_CONCURRENCY)]
    pub eager_concurrency: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "cannot pass both --noredact and --boxredact together. You can't redact and not redact at the same time!"
    )]
    ConflictingRedactFlags,
    #[error("detection address {0:?} must start with http:// or https://")]
    InvalidAddress(String),
    #[error("--eager-concurrency must be at least 1")]
    InvalidConcurrency,
    #[error("--detect-timeout-secs must be at least 1")]
    InvalidTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactMode {
    /// Serve originals only, never call the detection service
    Disabled,
    Overlay(OverlayMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processing {
    /// Redact each panel when it is requested
    Lazy,
    /// Redact every panel before the listener starts
    Eager,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_port: u16,
    pub directory: PathBuf,
    pub detection_address: String,
    pub redact_mode: RedactMode,
    pub processing: Processing,
    pub placeholder_path: PathBuf,
    pub detect_timeout: Duration,
    pub eager_concurrency: usize,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let redact_mode = match (args.noredact, args.boxredact) {
            (true, true) => return Err(ConfigError::ConflictingRedactFlags),
            (true, false) => RedactMode::Disabled,
            (false, true) => RedactMode::Overlay(OverlayMode::SolidFill),
            (false, false) => RedactMode::Overlay(OverlayMode::Outline),
        };

        if redact_mode != RedactMode::Disabled {
            let address = args.address.trim();
            if !(address.starts_with("http://") || address.starts_with("https://")) {
                return Err(ConfigError::InvalidAddress(args.address));
            }
            if args.detect_timeout_secs == 0 {
                return Err(ConfigError::InvalidTimeout);
            }
            if args.eager && args.eager_concurrency == 0 {
                return Err(ConfigError::InvalidConcurrency);
            }
        }

        Ok(Config {
            listen_port: args.listen_port,
            directory: args.directory,
            detection_address: args.address.trim().to_string(),
            redact_mode,
            processing: if args.eager {
                Processing::Eager
            } else {
                Processing::Lazy
            },
            placeholder_path: args.placeholder,
            detect_timeout: Duration::from_secs(args.detect_timeout_secs),
            eager_concurrency: args.eager_concurrency,
        })
    }
}
