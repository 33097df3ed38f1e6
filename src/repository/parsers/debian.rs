// src/repository/parsers/debian.rs

//! Debian/Ubuntu `Packages` index parser
//!
//! The index is a sequence of RFC 822 style stanzas separated by blank lines:
//!
//! ```text
//! Package: bash
//! Version: 5.1-6ubuntu1
//! Depends: base-files (>= 2.1.12), debianutils (>= 2.15)
//! Filename: pool/main/b/bash/bash_5.1-6ubuntu1_amd64.deb
//! Description: GNU Bourne Again SHell
//!  Bash is an sh-compatible command language interpreter.
//! ```
//!
//! Lines starting with whitespace continue the most recently set field and
//! are kept newline-joined, so no information is lost.

use crate::error::Result;
use crate::repository::client::RepositoryClient;
use crate::repository::parsers::{PackageIndex, PackageRecord};
use std::collections::HashMap;
use tracing::{debug, info};

/// Index file fetched from the `binary-<arch>/` directory
pub const PACKAGES_FILE: &str = "Packages.gz";

/// Fields followed when computing the dependency closure, in order
pub const DEPENDENCY_FIELDS: [&str; 2] = ["Pre-Depends", "Depends"];

const UNKNOWN: &str = "unknown";

/// One stanza of a `Packages` index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlStanza {
    fields: HashMap<String, String>,
}

impl ControlStanza {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Value of the `Package` field
    pub fn package(&self) -> Option<&str> {
        self.get("Package")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the ecosystem-neutral record for this stanza
    ///
    /// `requires` holds the raw comma-separated clauses of `Pre-Depends`
    /// followed by `Depends`. The download URL is attached later, when the
    /// download list is built.
    pub fn to_record(&self) -> Option<PackageRecord> {
        let name = self.package()?;
        let mut record = PackageRecord::new(
            name,
            self.get("Version").unwrap_or(UNKNOWN),
            self.get("Architecture").unwrap_or(UNKNOWN),
        );
        record.requires = DEPENDENCY_FIELDS
            .iter()
            .filter_map(|field| self.get(field))
            .flat_map(split_clauses)
            .collect();
        record.sha256 = self.get("SHA256").map(str::to_ascii_lowercase);
        record.size = self.get("Size").and_then(|s| s.trim().parse().ok());
        Some(record)
    }
}

/// Split a dependency field into its comma-separated clauses
pub fn split_clauses(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stanza being assembled line by line
#[derive(Debug, Default)]
struct StanzaBuilder {
    stanza: ControlStanza,
    last_field: Option<String>,
}

impl StanzaBuilder {
    fn set(&mut self, key: &str, value: &str) {
        self.stanza.fields.insert(key.to_string(), value.to_string());
        self.last_field = Some(key.to_string());
    }

    fn continue_last(&mut self, line: &str) {
        let Some(key) = self.last_field.as_ref() else {
            return;
        };
        if let Some(value) = self.stanza.fields.get_mut(key) {
            value.push('\n');
            value.push_str(line.trim());
        }
    }

    /// Finish the stanza; stanzas without a `Package` field are dropped
    fn commit(&mut self) -> Option<ControlStanza> {
        let builder = std::mem::take(self);
        if builder.stanza.package().is_some() {
            Some(builder.stanza)
        } else {
            if !builder.stanza.is_empty() {
                debug!("Discarding stanza without a Package field");
            }
            None
        }
    }
}

/// Parse the text of a `Packages` index into stanzas, in document order
pub fn parse_packages_text(text: &str) -> Vec<ControlStanza> {
    let mut stanzas = Vec::new();
    let mut current = StanzaBuilder::default();

    for raw in text.lines() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            stanzas.extend(current.commit());
        } else if line.starts_with([' ', '\t']) {
            current.continue_last(line);
        } else if let Some((key, value)) = line.split_once(':') {
            current.set(key.trim(), value.trim());
        }
    }
    stanzas.extend(current.commit());

    stanzas
}

/// Parser for one Debian `binary-<arch>/` index
#[derive(Debug)]
pub struct DebPackageParser {
    mirror_url: String,
    stanzas: HashMap<String, ControlStanza>,
    index: PackageIndex,
}

impl DebPackageParser {
    /// `mirror_url` is the `.../dists/<suite>/<component>/binary-<arch>/` directory
    pub fn new(mirror_url: &str) -> Self {
        Self {
            mirror_url: format!("{}/", mirror_url.trim_end_matches('/')),
            stanzas: HashMap::new(),
            index: PackageIndex::new(),
        }
    }

    pub fn mirror_url(&self) -> &str {
        &self.mirror_url
    }

    /// Archive root: the mirror URL truncated at `/dists/`
    pub fn archive_root(&self) -> &str {
        self.mirror_url
            .split("/dists/")
            .next()
            .unwrap_or(&self.mirror_url)
            .trim_end_matches('/')
    }

    /// Fetch and parse `Packages.gz`; returns the number of packages
    pub fn load_packages(&mut self, client: &RepositoryClient) -> Result<usize> {
        let url = format!("{}{}", self.mirror_url, PACKAGES_FILE);
        info!("Fetching package index {}", url);

        let text = client.fetch_and_decompress_string(&url)?;
        Ok(self.load_packages_text(&text))
    }

    /// Parse an already fetched index
    pub fn load_packages_text(&mut self, text: &str) -> usize {
        for stanza in parse_packages_text(text) {
            if let Some(record) = stanza.to_record() {
                self.index.insert(record);
                self.stanzas.insert(stanza.package().unwrap_or_default().to_string(), stanza);
            }
        }
        info!("Parsed {} packages from {}", self.index.len(), PACKAGES_FILE);
        self.index.len()
    }

    pub fn find_package(&self, name: &str) -> Option<&ControlStanza> {
        self.stanzas.get(name)
    }

    /// Absolute download URL of a package, from its `Filename` field
    pub fn package_url(&self, name: &str) -> Option<String> {
        let filename = self.find_package(name)?.get("Filename")?;
        Some(format!("{}/{}", self.archive_root(), filename.trim_start_matches('/')))
    }

    pub fn index(&self) -> &PackageIndex {
        &self.index
    }
}
