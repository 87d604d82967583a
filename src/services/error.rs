//! Logging helpers that turn handler errors into bare status codes.
//!
//! Per-panel failures are reported to the operator through the log and to the
//! browser as an empty response with the given status.

use axum::http::StatusCode;

pub trait LogErr<T> {
    /// Log the error with context and answer `400 Bad Request`
    fn log_400(self, context: &str) -> Result<T, StatusCode>;

    /// Log the error with context and answer `502 Bad Gateway`
    fn log_502(self, context: &str) -> Result<T, StatusCode>;

    /// Log the error with context and answer with a custom status
    fn log_status(self, context: &str, status: StatusCode) -> Result<T, StatusCode>;
}

impl<T, E: std::fmt::Display> LogErr<T> for Result<T, E> {
    fn log_400(self, context: &str) -> Result<T, StatusCode> {
        self.map_err(|e| {
            log::warn!("{}: {}", context, e);
            StatusCode::BAD_REQUEST
        })
    }

    fn log_502(self, context: &str) -> Result<T, StatusCode> {
        self.log_status(context, StatusCode::BAD_GATEWAY)
    }

    fn log_status(self, context: &str, status: StatusCode) -> Result<T, StatusCode> {
        self.map_err(|e| {
            log::error!("{}: {}", context, e);
            status
        })
    }
}
