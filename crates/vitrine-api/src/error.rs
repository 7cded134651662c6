//! Error logging for handlers
//!
//! Upload endpoints never answer with an error status: failures are rendered into the
//! JSON contract by [`crate::response`]. This module logs each error at the level its
//! metadata asks for before it is rendered.

use vitrine_core::{AppError, ErrorMetadata, LogLevel};

pub fn log_error(error: &AppError, operation: &'static str) {
    let code = error.error_code();
    let recoverable = error.is_recoverable();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, code, recoverable, operation, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, code, recoverable, operation, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, code, recoverable, operation, "Request failed");
        }
    }
}
