use thiserror::Error;

/// Failures surfaced to API callers. Each variant carries the user-facing
/// message; engine and IO details only go to the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("{0}")]
    InvalidRequest(String),
    /// The engine could not resolve the URL.
    #[error("{0}")]
    Extraction(String),
    /// The URL resolved but downloading or transcoding failed.
    #[error("{0}")]
    Download(String),
}

impl MediaError {
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest(message) | Self::Extraction(message) | Self::Download(message) => {
                message
            }
        }
    }
}
