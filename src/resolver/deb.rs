// src/resolver/deb.rs

//! Debian dependency resolver
//!
//! Follows `Pre-Depends` then `Depends`. Version constraints and
//! architecture qualifiers are ignored; for `a | b` clauses the first
//! alternative present in the index is taken.

use super::download_list::dedup_by_name;
use super::{walk_closure, DependencyResolver};
use crate::error::Result;
use crate::repository::{DebPackageParser, PackageRecord};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Leading package-name token of a dependency alternative
static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([a-zA-Z0-9+.-]+)").unwrap());

/// Package names of each alternative in one clause, in order
///
/// `libc6 (>= 2.34) | libc6.1:any` yields `["libc6", "libc6.1"]`.
pub fn dependency_names(clause: &str) -> Vec<String> {
    clause
        .split('|')
        .filter_map(|alternative| {
            PACKAGE_NAME
                .captures(alternative.trim())
                .map(|caps| caps[1].to_string())
        })
        .collect()
}

/// Resolver over a parsed `Packages` index
#[derive(Debug)]
pub struct DebResolver<'a> {
    parser: &'a DebPackageParser,
}

impl<'a> DebResolver<'a> {
    pub fn new(parser: &'a DebPackageParser) -> Self {
        Self { parser }
    }

    fn choose(&self, clause: &str) -> Option<String> {
        let alternatives = dependency_names(clause);
        let chosen = alternatives
            .iter()
            .find(|name| self.parser.index().contains(name))
            .cloned();
        if chosen.is_none() {
            debug!("No package in index for '{}', dropping", clause);
        }
        chosen
    }
}

impl DependencyResolver for DebResolver<'_> {
    fn resolve(&self, name: &str) -> Result<Vec<PackageRecord>> {
        walk_closure(self.parser.index(), name, |clause, _| self.choose(clause))
    }

    /// Attaches each package's download URL from its `Filename` field
    fn download_list(&self, records: &[PackageRecord]) -> Vec<PackageRecord> {
        dedup_by_name(records, |name| self.parser.package_url(name))
    }
}
