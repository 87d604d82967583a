//! Application constants

/// Default port for the preview server
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Default address of the detection service
pub const DEFAULT_DETECTION_ADDRESS: &str = "http://localhost:5000";

/// Default fallback asset, served whenever a source image cannot be used
pub const DEFAULT_PLACEHOLDER_PATH: &str = "404.txt";

/// Default timeout for one detection call (60 seconds)
pub const DEFAULT_DETECT_TIMEOUT_SECS: u64 = 60;

/// Default number of panels redacted in parallel by the startup pass
pub const DEFAULT_EAGER_CONCURRENCY: usize = 4;

/// Multipart field carrying the image bytes
pub const DETECTION_FIELD_NAME: &str = "file";

/// Outline stroke thickness in pixels
pub const STROKE_WIDTH: i64 = 2;

/// Opaque red used for every overlay
pub const REDACTION_COLOR: [u8; 4] = [255, 0, 0, 255];
