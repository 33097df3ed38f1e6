// src/repository/mod.rs

//! Mirror access: metadata fetching, parsing and package downloads
//!
//! This module provides functionality for:
//! - Fetching and decompressing mirror documents over HTTP
//! - Parsing RPM repodata and Debian `Packages` indices
//! - Downloading resolved packages in parallel with checksum verification

mod client;
pub mod download;
pub mod parsers;

pub use client::{RepositoryClient, HTTP_TIMEOUT};
pub use download::{download_packages, verify_checksum, DownloadOptions, DownloadReport};
pub use parsers::debian::DebPackageParser;
pub use parsers::fedora::RpmRepodataParser;
pub use parsers::{PackageIndex, PackageRecord};
