// src/repository/parsers/mod.rs

//! Repository metadata parsers for different package formats
//!
//! This module provides parsers for native repository metadata formats:
//! - Fedora/RPM: repomd.xml and primary.xml files
//! - Debian/Ubuntu: Packages.gz files
//!
//! Both produce [`PackageRecord`]s collected in a [`PackageIndex`].

pub mod debian;
pub mod fedora;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Package metadata extracted from a repository index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package name, unique within one index
    pub name: String,

    /// Package version, `"unknown"` when the metadata carries none
    pub version: String,

    /// Architecture (x86_64, aarch64, noarch, amd64, all, ...)
    pub arch: String,

    /// Absolute download URL. Debian records receive it when the
    /// download list is built.
    pub download_url: Option<String>,

    /// Raw dependency expressions in metadata order
    pub requires: Vec<String>,

    /// Raw capability strings (RPM only)
    pub provides: Vec<String>,

    /// SHA-256 of the package file, when published
    pub sha256: Option<String>,

    /// Package file size in bytes, when published
    pub size: Option<u64>,
}

impl PackageRecord {
    /// Create a record with no dependencies or provides
    pub fn new(name: impl Into<String>, version: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            arch: arch.into(),
            download_url: None,
            requires: Vec::new(),
            provides: Vec::new(),
            sha256: None,
            size: None,
        }
    }

    /// File name of the package as published on the mirror
    pub fn file_name(&self) -> String {
        self.download_url
            .as_deref()
            .and_then(|url| url.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}.{}", self.name, self.version, self.arch))
    }
}

/// Name-keyed package index built from one metadata document
///
/// Iteration follows document order of first appearance. Inserting a name
/// that is already present replaces the record in place.
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    records: Vec<PackageRecord>,
    by_name: HashMap<String, usize>,
}

impl PackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: PackageRecord) {
        match self.by_name.get(&record.name) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.by_name.insert(record.name.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.by_name.get(name).map(|&slot| &self.records[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageRecord> {
        self.records.iter()
    }
}

impl FromIterator<PackageRecord> for PackageIndex {
    fn from_iter<I: IntoIterator<Item = PackageRecord>>(iter: I) -> Self {
        let mut index = PackageIndex::new();
        for record in iter {
            index.insert(record);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_replaces_in_place() {
        let mut index = PackageIndex::new();
        index.insert(PackageRecord::new("bash", "4.4", "i686"));
        index.insert(PackageRecord::new("glibc", "2.28", "x86_64"));
        index.insert(PackageRecord::new("bash", "5.1", "x86_64"));

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("bash").unwrap().version, "5.1");

        let names: Vec<_> = index.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["bash", "glibc"]);
    }

    #[test]
    fn test_index_lookup_missing() {
        let index: PackageIndex = vec![PackageRecord::new("zlib", "1.2", "x86_64")]
            .into_iter()
            .collect();
        assert!(index.contains("zlib"));
        assert!(index.get("nonexistent-xyz").is_none());
        assert!(!index.is_empty());
    }

    #[test]
    fn test_file_name() {
        let mut record = PackageRecord::new("bash", "5.1", "x86_64");
        assert_eq!(record.file_name(), "bash-5.1.x86_64");

        record.download_url = Some("https://mirror.example/Packages/bash-5.1-2.x86_64.rpm".to_string());
        assert_eq!(record.file_name(), "bash-5.1-2.x86_64.rpm");
    }
}
