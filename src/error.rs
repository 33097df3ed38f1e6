// src/error.rs

//! Error types shared across the crate

use thiserror::Error;

/// Errors produced while fetching, parsing and resolving repository metadata
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure, timeout or non-2xx response while fetching a document
    #[error("Fetch failed: {0}")]
    FetchError(String),

    /// Expected metadata structure is missing (e.g. no primary data location)
    #[error("Invalid repository metadata: {0}")]
    MetadataError(String),

    /// A fetched document could not be decompressed or decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The requested package is not present in the package index
    #[error("Package '{0}' not found")]
    PackageNotFound(String),

    /// The distribution identifier is not configured
    #[error("Unknown distribution: {0}")]
    UnknownDistribution(String),

    /// Invalid configuration file or request
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A package download failed
    #[error("Download failed: {0}")]
    DownloadError(String),

    /// Downloaded file does not match the checksum from metadata
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Filesystem error
    #[error("I/O error: {0}")]
    IoError(String),

    /// Failed to set up a component (HTTP client, thread pool)
    #[error("Initialization error: {0}")]
    InitError(String),
}

impl Error {
    /// True when the error only concerns a single missing package
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PackageNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
