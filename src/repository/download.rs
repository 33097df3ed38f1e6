// src/repository/download.rs

//! Parallel package downloads
//!
//! Every record of a download list is fetched on a rayon pool into
//! `dest_dir/<file name>`. Individual failures are collected into the
//! [`DownloadReport`] instead of aborting the batch. When the metadata
//! published a SHA-256 the file is verified, and removed on mismatch.

use crate::error::{Error, Result};
use crate::repository::client::RepositoryClient;
use crate::repository::parsers::PackageRecord;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Options for a batch download
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Number of concurrent downloads
    pub jobs: usize,
    /// Draw progress bars on the terminal
    pub show_progress: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            jobs: 5,
            show_progress: true,
        }
    }
}

/// Outcome of a batch download
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Paths of the files written, in download-list order
    pub succeeded: Vec<PathBuf>,
    /// `(package name, error message)` for each failed record
    pub failed: Vec<(String, String)>,
    /// Total bytes written
    pub bytes: u64,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Download one record into `dest_dir`
///
/// The file is named after the last segment of its URL. A checksum mismatch
/// removes the file before the error is returned.
pub fn download_package(
    client: &RepositoryClient,
    record: &PackageRecord,
    dest_dir: &Path,
    progress: Option<&ProgressBar>,
) -> Result<(PathBuf, u64)> {
    let url = record
        .download_url
        .as_deref()
        .ok_or_else(|| Error::DownloadError(format!("Package {} has no download URL", record.name)))?;

    let dest_path = dest_dir.join(record.file_name());
    let written = client.download_file(url, &dest_path, progress)?;

    if let Some(expected) = record.sha256.as_deref()
        && let Err(e) = verify_checksum(&dest_path, expected)
    {
        let _ = std::fs::remove_file(&dest_path);
        return Err(e);
    }

    Ok((dest_path, written))
}

/// Download every record concurrently
///
/// Returns an error only when the thread pool cannot be built; per-package
/// failures are reported in [`DownloadReport::failed`].
pub fn download_packages(
    client: &RepositoryClient,
    records: &[PackageRecord],
    dest_dir: &Path,
    options: &DownloadOptions,
) -> Result<DownloadReport> {
    if records.is_empty() {
        return Ok(DownloadReport::default());
    }

    std::fs::create_dir_all(dest_dir).map_err(|e| {
        Error::IoError(format!("Failed to create directory {}: {e}", dest_dir.display()))
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .build()
        .map_err(|e| Error::InitError(format!("Failed to build download pool: {e}")))?;

    let total_size: u64 = records.iter().filter_map(|r| r.size).sum();
    info!(
        "Downloading {} packages with {} workers ({:.2} MB known)",
        records.len(),
        options.jobs.max(1),
        total_size as f64 / 1_048_576.0
    );

    let progress = DownloadProgress::with_aggregate(records.len(), total_size, options.show_progress);
    let progress_bars: Vec<_> = records
        .iter()
        .map(|record| progress.add_download(&record.name, record.size.unwrap_or(0)))
        .collect();

    let results: Vec<Result<(PathBuf, u64)>> = pool.install(|| {
        records
            .par_iter()
            .zip(progress_bars.par_iter())
            .map(|(record, pb)| {
                debug!("Downloading {}", record.name);
                let result = download_package(client, record, dest_dir, Some(pb));
                match &result {
                    Ok((_, written)) => {
                        DownloadProgress::finish_download(pb, &record.name);
                        progress.update_overall(*written);
                    }
                    Err(e) => {
                        DownloadProgress::fail_download(pb, &record.name, &e.to_string());
                        progress.update_overall(0);
                    }
                }
                result
            })
            .collect()
    });

    let mut report = DownloadReport::default();
    for (record, result) in records.iter().zip(results) {
        match result {
            Ok((path, written)) => {
                report.bytes += written;
                report.succeeded.push(path);
            }
            Err(e) => {
                warn!("Failed to download {}: {}", record.name, e);
                report.failed.push((record.name.clone(), e.to_string()));
            }
        }
    }

    progress.finish_all(report.succeeded.len(), report.failed.len(), report.bytes);
    Ok(report)
}

/// Lowercase hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {e}", path.display())))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| Error::IoError(format!("Failed to read {}: {e}", path.display())))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Verify file checksum matches expected value
pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    debug!("Verifying checksum for {}", path.display());

    let actual = sha256_file(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }

    debug!("Checksum verified: {}", expected);
    Ok(())
}

fn bar_style(template: &str, chars: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .map(|style| style.progress_chars(chars))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Multi-progress manager for parallel downloads
///
/// Wraps indicatif's MultiProgress with one bar per package plus an
/// aggregate bar. A hidden draw target keeps the bookkeeping when output
/// is disabled.
pub struct DownloadProgress {
    multi: MultiProgress,
    overall: ProgressBar,
    package_count: usize,
    completed: AtomicUsize,
}

impl DownloadProgress {
    pub fn with_aggregate(package_count: usize, total_size: u64, visible: bool) -> Self {
        let multi = if visible {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let overall = ProgressBar::new(total_size);
        overall.set_style(bar_style(
            "Total: [{bar:40.green/dim}] {bytes}/{total_bytes} ({bytes_per_sec}) - {msg}",
            "=>-",
        ));
        overall.set_message(format!("0/{} packages", package_count));
        let overall = multi.add(overall);

        Self {
            multi,
            overall,
            package_count,
            completed: AtomicUsize::new(0),
        }
    }

    /// Create a progress bar for a package download
    pub fn add_download(&self, name: &str, size: u64) -> ProgressBar {
        let pb = ProgressBar::new(size);
        pb.set_style(bar_style(
            "{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
            "#>-",
        ));
        pb.set_message(name.to_string());
        self.multi.add(pb)
    }

    /// Count one finished package (successful or not) and its bytes
    pub fn update_overall(&self, bytes: u64) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        self.overall.inc(bytes);
        if self.overall.position() > self.overall.length().unwrap_or(0) {
            self.overall.set_length(self.overall.position());
        }
        self.overall
            .set_message(format!("{}/{} packages", completed, self.package_count));
    }

    pub fn finish_download(pb: &ProgressBar, name: &str) {
        pb.finish_with_message(format!("{} [done]", name));
    }

    pub fn fail_download(pb: &ProgressBar, name: &str, error: &str) {
        pb.abandon_with_message(format!("{} [FAILED: {}]", name, error));
    }

    /// Finish all downloads and show summary
    pub fn finish_all(&self, succeeded: usize, failed: usize, total_bytes: u64) {
        let mb = total_bytes as f64 / 1_048_576.0;
        if failed > 0 {
            self.overall.finish_with_message(format!(
                "{} succeeded, {} failed ({:.2} MB)",
                succeeded, failed, mb
            ));
        } else {
            self.overall
                .finish_with_message(format!("{} packages ({:.2} MB)", succeeded, mb));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, url: Option<String>) -> PackageRecord {
        let mut record = PackageRecord::new(name, "1.0", "x86_64");
        record.download_url = url;
        record
    }

    fn quiet() -> DownloadOptions {
        DownloadOptions {
            jobs: 2,
            show_progress: false,
        }
    }

    #[test]
    fn test_sha256_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"hello world").unwrap();

        assert_eq!(
            sha256_file(&path).unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert!(verify_checksum(&path, "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9").is_ok());
        assert!(matches!(
            verify_checksum(&path, "00"),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_download_packages_collects_failures() {
        let mut server = mockito::Server::new();
        let _ok = server.mock("GET", "/Packages/a-1.0.rpm").with_body("aaaa").create();
        let _missing = server.mock("GET", "/Packages/b-1.0.rpm").with_status(404).create();

        let records = vec![
            record("a", Some(format!("{}/Packages/a-1.0.rpm", server.url()))),
            record("b", Some(format!("{}/Packages/b-1.0.rpm", server.url()))),
            record("c", None),
        ];

        let dir = tempfile::tempdir().unwrap();
        let client = RepositoryClient::new().unwrap();
        let report = download_packages(&client, &records, dir.path(), &quiet()).unwrap();

        assert_eq!(report.succeeded, vec![dir.path().join("a-1.0.rpm")]);
        assert_eq!(report.bytes, 4);
        let failed: Vec<_> = report.failed.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(failed, vec!["b", "c"]);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_checksum_mismatch_removes_file() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/pool/x_1.0_amd64.deb").with_body("payload").create();

        let mut bad = record("x", Some(format!("{}/pool/x_1.0_amd64.deb", server.url())));
        bad.sha256 = Some("0".repeat(64));

        let dir = tempfile::tempdir().unwrap();
        let client = RepositoryClient::new().unwrap();
        let result = download_package(&client, &bad, dir.path(), None);

        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
        assert!(!dir.path().join("x_1.0_amd64.deb").exists());
    }

    #[test]
    fn test_overall_progress_advances() {
        let progress = DownloadProgress::with_aggregate(3, 100, false);
        progress.update_overall(40);
        progress.update_overall(0);
        assert_eq!(progress.overall.position(), 40);
        assert_eq!(progress.overall.message(), "2/3 packages");

        progress.update_overall(90);
        assert_eq!(progress.overall.position(), 130);
        assert_eq!(progress.overall.length(), Some(130));
        assert_eq!(progress.overall.message(), "3/3 packages");
    }

    #[test]
    fn test_empty_download_list() {
        let dir = tempfile::tempdir().unwrap();
        let client = RepositoryClient::new().unwrap();
        let report = download_packages(&client, &[], dir.path(), &quiet()).unwrap();
        assert!(report.succeeded.is_empty());
        assert!(report.is_complete());
    }
}
