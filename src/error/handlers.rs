//! Standardized error handling for daemon responses

use crate::error::SyncError;
use reqwest::StatusCode;

/// Standard error handler for Docker Engine API responses
pub struct DaemonErrorHandler;

impl DaemonErrorHandler {
    /// Map a non-success status of an image operation to an error
    pub fn handle_image_error(status: StatusCode, error_text: &str, operation: &str) -> SyncError {
        let error_text = Self::extract_message(error_text);
        match status.as_u16() {
            400 => SyncError::Daemon(format!("Bad parameter for {}: {}", operation, error_text)),
            401 => SyncError::Auth(format!("Unauthorized to {}: {}", operation, error_text)),
            403 => SyncError::Auth(format!(
                "Forbidden: insufficient permissions to {}: {}",
                operation, error_text
            )),
            404 => SyncError::NotFound(format!("No such image for {}: {}", operation, error_text)),
            409 => SyncError::Daemon(format!("Conflict during {}: {}", operation, error_text)),
            500 => SyncError::Daemon(format!("Daemon error during {}: {}", operation, error_text)),
            502 | 503 => SyncError::Daemon(format!(
                "Daemon unavailable for {}: {}",
                operation, error_text
            )),
            _ => SyncError::Daemon(format!(
                "{} failed (status {}): {}",
                operation, status, error_text
            )),
        }
    }

    /// The daemon wraps errors as `{"message": "..."}`; fall back to the raw body
    fn extract_message(error_text: &str) -> String {
        serde_json::from_str::<serde_json::Value>(error_text)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| error_text.trim().to_string())
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> SyncError {
        if error.is_timeout() {
            SyncError::Timeout(format!("{} timeout: {}", context, error))
        } else if error.is_connect() {
            SyncError::Network(format!("Connection error during {}: {}", context, error))
        } else if error.to_string().contains("dns") {
            SyncError::Network(format!("DNS resolution error for {}: {}", context, error))
        } else {
            SyncError::Network(format!("{} network error: {}", context, error))
        }
    }
}
