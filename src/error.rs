//! Error handling and custom error types
//!
//! Every failure of the fetch-transform-persist pipeline is one variant of
//! [`Error`]. Cleanup failures never appear here; they are swallowed by the
//! store and only reported through logs and the cleanup hook.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported protocol '{0}': only http and https are allowed")]
    UnsupportedProtocol(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upstream error: HTTP {status}: {reason}")]
    Upstream { status: u16, reason: String },

    #[error("URL does not point to an image. Content-Type: {}", .0.as_deref().unwrap_or("<missing>"))]
    UnsupportedContentType(Option<String>),

    #[error("Received empty image data")]
    EmptyPayload,

    #[error("Image decode error: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Image encode error: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

/// Coarse classification of an [`Error`], used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedProtocol,
    Network,
    Upstream,
    UnsupportedContentType,
    EmptyPayload,
    Decode,
    Encode,
    Write,
    Config,
    Server,
    Invariant,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::UnsupportedProtocol(_) => ErrorKind::UnsupportedProtocol,
            Error::Network(_) => ErrorKind::Network,
            Error::Upstream { .. } => ErrorKind::Upstream,
            Error::UnsupportedContentType(_) => ErrorKind::UnsupportedContentType,
            Error::EmptyPayload => ErrorKind::EmptyPayload,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Encode(_) => ErrorKind::Encode,
            Error::Write { .. } => ErrorKind::Write,
            Error::Config(_) => ErrorKind::Config,
            Error::Server(_) => ErrorKind::Server,
            Error::Invariant(_) => ErrorKind::Invariant,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
