//! Error types for scratch-dl
//!
//! This module provides the error taxonomy for the download pipeline:
//! - Format errors (the manifest is not what the chosen loader expects)
//! - Transport and read errors (network, HTTP status, undecodable bodies)
//! - Asset errors (unknown asset family, integrity mismatch)
//! - Ambient errors (configuration, I/O, archive, serialization)

use crate::types::ProjectFormat;
use thiserror::Error;

/// Result type alias for scratch-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for scratch-dl
///
/// Every variant carries enough context (URL, asset key, suggested format) for the
/// caller to decide whether to re-dispatch, retry, or give up.
#[derive(Debug, Error)]
pub enum Error {
    /// The fetched manifest does not match the loader that was invoked
    ///
    /// `probable` carries a best guess of the loader that would accept it.
    #[error("{message}{}", probable_suffix(.probable))]
    FormatMismatch {
        /// Human-readable description of the failed check
        message: String,
        /// The format the manifest most likely is
        probable: Option<ProjectFormat>,
    },

    /// The manifest (or a requested format name) is not recognized at all
    #[error("unknown project format: {0}")]
    UnknownFormat(String),

    /// Non-success status or network-level failure on a fetch
    #[error("transport error fetching {url}: {reason}")]
    Transport {
        /// The URL that was being fetched
        url: String,
        /// What went wrong (status line, connect error, timeout)
        reason: String,
        /// HTTP status code, when the server answered
        status: Option<u16>,
    },

    /// A fetched body could not be decoded as expected
    #[error("failed to read response from {url}: {reason}")]
    Read {
        /// The URL whose body could not be read
        url: String,
        /// Decoder error message
        reason: String,
    },

    /// An asset reference has an extension outside all known asset families
    #[error("unknown extension: {extension} (asset {key})")]
    MalformedAsset {
        /// Dedup key of the offending asset
        key: String,
        /// The extension that could not be classified
        extension: String,
    },

    /// A fetched asset does not hash to the content hash it was requested by
    #[error("asset {key} is corrupt: content hashes to {actual}")]
    CorruptAsset {
        /// Dedup key of the asset
        key: String,
        /// Hex md5 of the bytes that were received
        actual: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_requests")
        key: Option<String>,
    },

    /// Archive assembly or reading failed
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error raised by the HTTP client outside a specific fetch
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

fn probable_suffix(probable: &Option<ProjectFormat>) -> String {
    match probable {
        Some(format) => format!(" (probably a .{})", format.extension()),
        None => String::new(),
    }
}

impl Error {
    /// Build a format mismatch error with an optional suggested format
    pub fn format_mismatch(message: impl Into<String>, probable: Option<ProjectFormat>) -> Self {
        Error::FormatMismatch {
            message: message.into(),
            probable,
        }
    }

    /// The format a [`Error::FormatMismatch`] suggests re-dispatching to, if any
    pub fn probable_format(&self) -> Option<ProjectFormat> {
        match self {
            Error::FormatMismatch { probable, .. } => *probable,
            _ => None,
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            Error::FormatMismatch { .. } => "format_mismatch",
            Error::UnknownFormat(_) => "unknown_format",
            Error::Transport { .. } => "transport_failure",
            Error::Read { .. } => "read_failure",
            Error::MalformedAsset { .. } => "malformed_asset",
            Error::CorruptAsset { .. } => "corrupt_asset",
            Error::Config { .. } => "config_error",
            Error::Archive(_) => "archive_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }

    /// The pipeline stage that failed, for user-facing reports
    pub fn stage(&self) -> &'static str {
        match self {
            Error::FormatMismatch { .. } | Error::UnknownFormat(_) => "detect",
            Error::Transport { .. } | Error::Read { .. } | Error::Network(_) => "fetch",
            Error::MalformedAsset { .. } | Error::CorruptAsset { .. } => "assets",
            Error::Archive(_) => "archive",
            Error::Io(_) => "write",
            Error::Config { .. } => "config",
            Error::Serialization(_) | Error::Other(_) => "internal",
        }
    }
}
