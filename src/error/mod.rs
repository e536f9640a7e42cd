//! Error types and handlers for sync operations

pub mod handlers;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
    /// Container daemon rejected a request or reported an error message
    #[error("Daemon error: {0}")]
    Daemon(String),
    /// Network related errors
    #[error("Network error: {0}")]
    Network(String),
    /// Network call exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Managed registry service errors (token issuance, repository management)
    #[error("Managed registry error: {0}")]
    ManagedRegistry(String),
    #[error("error pulling source image '{reference}': {reason}")]
    Pull { reference: String, reason: String },
    #[error("error setting tags: {0}")]
    Tag(String),
    #[error("error pushing target image: {0}")]
    Push(String),
    /// File IO errors
    #[error("IO error: {0}")]
    Io(String),
    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for SyncError {
    fn from(err: serde_yaml::Error) -> Self {
        SyncError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        handlers::NetworkErrorHandler::handle_network_error(&err, "daemon request")
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::Config(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for SyncError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        SyncError::Parse(format!("UTF-8 conversion error: {}", err))
    }
}
