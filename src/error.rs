//! Error types for tubedl

use thiserror::Error;

/// Main error type for tubedl operations
#[derive(Debug, Error)]
pub enum TubeError {
    #[error("Enter a valid youtube URL! ({0})")]
    InvalidUrl(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("{0}")]
    Extraction(String),

    #[error("No videos matching quality: {quality} & filters: {}", .filters.join(", "))]
    NoMatchingFormat {
        /// Quality hint that was active when selection failed
        quality: String,
        /// Names of the predicates that were applied
        filters: Vec<String>,
    },

    #[error("Server responded with HTTP {0}")]
    HttpStatus(u16),

    #[error("Download failed: {0}")]
    DownloadFailed(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

/// Coarse classification used when reporting a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad URL or flag value, detected before any network call
    Validation,
    /// The collaborator could not fetch metadata or the media stream
    Extraction,
    /// Predicates and quality hint left nothing to download
    NoMatchingFormat,
    /// Directory or file write failure
    Filesystem,
}

impl TubeError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TubeError::InvalidUrl(_) | TubeError::InvalidOption(_) => ErrorKind::Validation,
            TubeError::NoMatchingFormat { .. } => ErrorKind::NoMatchingFormat,
            TubeError::IoError(_) => ErrorKind::Filesystem,
            TubeError::Extraction(_)
            | TubeError::HttpStatus(_)
            | TubeError::DownloadFailed(_)
            | TubeError::JsonError(_)
            | TubeError::UrlError(_) => ErrorKind::Extraction,
        }
    }

    /// Check if the error was raised before touching the network
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}
