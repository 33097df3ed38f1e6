// src/repository/client.rs

//! HTTP client for repository operations
//!
//! Wraps a blocking reqwest client. Metadata fetches are single-shot: any
//! failure is fatal for the resolution session. Package downloads retry on
//! transport errors.

use crate::compression::decompress_auto;
use crate::error::{Error, Result};
use indicatif::ProgressBar;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum attempts for a package download
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds, multiplied by the attempt number
const RETRY_DELAY_MS: u64 = 1000;

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// HTTP client wrapper used by the metadata parsers and the downloader
#[derive(Debug, Clone)]
pub struct RepositoryClient {
    client: Client,
    max_retries: u32,
}

impl RepositoryClient {
    /// Create a client with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(HTTP_TIMEOUT)
    }

    /// Create a client whose requests time out after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("offpkg/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Fetch a URL into memory without retrying
    pub fn download_to_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                Error::FetchError(format!("Timed out fetching {url}"))
            } else {
                Error::FetchError(format!("Failed to fetch {url}: {e}"))
            }
        })?;

        if !response.status().is_success() {
            return Err(Error::FetchError(format!("HTTP {} from {}", response.status(), url)));
        }

        let bytes = response
            .bytes()
            .map_err(|e| Error::FetchError(format!("Failed to read response from {url}: {e}")))?;

        Ok(bytes.to_vec())
    }

    /// Fetch a URL and decompress it according to its magic bytes
    pub fn fetch_and_decompress(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.download_to_bytes(url)?;
        let decompressed = decompress_auto(&bytes)
            .map_err(|e| Error::ParseError(format!("Failed to decompress data from {url}: {e}")))?;

        debug!("Decompressed {} bytes -> {} bytes", bytes.len(), decompressed.len());
        Ok(decompressed)
    }

    /// Fetch, decompress and decode a document as UTF-8
    pub fn fetch_and_decompress_string(&self, url: &str) -> Result<String> {
        let bytes = self.fetch_and_decompress(url)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in response from {url}: {e}")))
    }

    /// Download a file to `dest_path`, retrying transport errors
    ///
    /// Data is streamed to `<dest>.tmp` and renamed into place once complete.
    /// A connection failure or a body cut short is retried; HTTP error
    /// statuses are not. No `.tmp` file survives a failed download. Returns
    /// the number of bytes written.
    pub fn download_file(&self, url: &str, dest_path: &Path, progress: Option<&ProgressBar>) -> Result<u64> {
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {e}", parent.display()))
            })?;
        }

        let temp_path = dest_path.with_extension("tmp");
        let mut attempt = 0;
        let written = loop {
            attempt += 1;
            match self.download_attempt(url, &temp_path, progress) {
                Ok(written) => break written,
                Err(AttemptError::Fatal(e)) => {
                    let _ = fs::remove_file(&temp_path);
                    return Err(e);
                }
                Err(AttemptError::Transport(e)) => {
                    let _ = fs::remove_file(&temp_path);
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to download {url} after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("Download attempt {} for {} failed: {}, retrying...", attempt, url, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        };

        fs::rename(&temp_path, dest_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::IoError(format!(
                "Failed to move {} to {}: {e}",
                temp_path.display(),
                dest_path.display()
            ))
        })?;

        info!("Downloaded {} ({} bytes)", dest_path.display(), written);
        Ok(written)
    }

    fn download_attempt(
        &self,
        url: &str,
        temp_path: &Path,
        progress: Option<&ProgressBar>,
    ) -> std::result::Result<u64, AttemptError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AttemptError::Fatal(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            ))));
        }

        if let Some(pb) = progress {
            pb.set_length(response.content_length().unwrap_or(0));
            pb.set_position(0);
        }

        let mut file = File::create(temp_path).map_err(|e| {
            AttemptError::Fatal(Error::IoError(format!(
                "Failed to create file {}: {e}",
                temp_path.display()
            )))
        })?;
        stream_response_to_file(response, &mut file, progress)
    }
}

/// Why one download attempt failed
enum AttemptError {
    /// Connection or body read failure, worth another attempt
    Transport(String),
    Fatal(Error),
}

/// Stream an HTTP response body into `file` in fixed-size chunks
fn stream_response_to_file(
    mut response: reqwest::blocking::Response,
    file: &mut File,
    progress: Option<&ProgressBar>,
) -> std::result::Result<u64, AttemptError> {
    let expected = response.content_length();
    let mut written: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| AttemptError::Transport(format!("Failed to read response: {e}")))?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| AttemptError::Fatal(Error::IoError(format!("Failed to write data: {e}"))))?;
        written += bytes_read as u64;

        if let Some(pb) = progress {
            pb.set_position(written);
        }
    }

    if let Some(expected) = expected
        && written < expected
    {
        return Err(AttemptError::Transport(format!(
            "Response ended after {written} of {expected} bytes"
        )));
    }

    Ok(written)
}
