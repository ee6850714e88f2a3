//! Error types shared by every gittar operation

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, downloading or extracting an archive
#[derive(Debug, Error)]
pub enum Error {
    /// Identifier string could not be turned into `site:owner/name#ref`
    #[error("Invalid repository identifier `{input}`: {reason}")]
    Parse { input: String, reason: String },

    /// Provider name outside the supported set
    #[error("Unsupported provider: {0} (expected github, gitlab or bitbucket)")]
    UnsupportedProvider(String),

    /// Remote answered with a status >= 400
    #[error("{code} {message}")]
    Http { code: u16, message: String },

    /// Connection, TLS or body transfer failed
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Redirect chain longer than the configured limit
    #[error("Too many redirects ({limit}) while fetching {url}")]
    TooManyRedirects { url: String, limit: usize },

    /// 3xx response whose `Location` is missing or unusable
    #[error("Invalid redirect from {url}: {reason}")]
    InvalidRedirect { url: String, reason: String },

    /// Only http and https URLs can be downloaded
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Payload exceeds the configured maximum
    #[error("Content too large: {size} bytes (max: {max})")]
    ContentTooLarge { size: u64, max: u64 },

    /// Cache-only lookup found nothing. Deliberately carries no payload.
    #[error("")]
    NotCached,

    /// Extraction source is missing
    #[error("File does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Archive could not be unpacked
    #[error("Failed to extract archive: {0}")]
    Extraction(String),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// HTTP status code, when the failure came from a remote response
    pub fn code(&self) -> Option<u16> {
        match self {
            Error::Http { code, .. } => Some(*code),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for the silent cache-only miss
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Error::NotCached)
    }
}
