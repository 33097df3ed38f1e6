// src/resolver/capability.rs

//! Shared-library capability index for RPM repodata
//!
//! RPM packages require libraries by soname token rather than by package
//! name (`libc.so.6(GLIBC_2.2.5)(64bit)`). The index maps every `.so`
//! token found in a `provides` list to the packages that publish it.

use crate::repository::PackageIndex;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// `<base>.so[.N...]`, an optional symbol version group, an optional bit-width marker
static LIBRARY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9._+-]+\.so[0-9.]*)(?:\([^)]*\))?(\(\d+bit\))?").unwrap()
});

/// Lookup keys to try for a library requirement, most specific first
///
/// 1. the raw requirement
/// 2. the normalized token: base name, empty symbol group and bit marker
///    (`libc.so.6(GLIBC_2.2.5)(64bit)` becomes `libc.so.6()(64bit)`)
/// 3. the bare base name (`libc.so.6`)
pub fn capability_candidates(requirement: &str) -> Vec<String> {
    let mut candidates = vec![requirement.to_string()];

    if let Some(caps) = LIBRARY_TOKEN.captures(requirement) {
        let base = &caps[1];
        let normalized = match caps.get(2) {
            Some(bits) => format!("{base}(){}", bits.as_str()),
            None => base.to_string(),
        };
        for candidate in [normalized, base.to_string()] {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

/// Map from capability token to providing packages, in document order
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    providers: HashMap<String, Vec<String>>,
}

impl CapabilityIndex {
    /// Scan every record's `provides` for tokens containing `.so`
    pub fn build(index: &PackageIndex) -> Self {
        let mut providers: HashMap<String, Vec<String>> = HashMap::new();
        for record in index.iter() {
            for token in record.provides.iter().filter(|p| p.contains(".so")) {
                let names = providers.entry(token.clone()).or_default();
                if !names.contains(&record.name) {
                    names.push(record.name.clone());
                }
            }
        }
        Self { providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Providers of an exact token
    pub fn get(&self, token: &str) -> Option<&[String]> {
        self.providers.get(token).map(Vec::as_slice)
    }

    /// Providers of the first candidate token present in the index
    pub fn providers(&self, requirement: &str) -> Option<&[String]> {
        capability_candidates(requirement)
            .iter()
            .find_map(|candidate| self.get(candidate))
    }

    /// Pick the package that satisfies `requirement`
    ///
    /// A provider already in `visited` wins; otherwise the first provider in
    /// document order. `None` when nothing provides the requirement.
    pub fn select(&self, requirement: &str, visited: &HashSet<String>) -> Option<Selection<'_>> {
        let providers = self.providers(requirement)?;
        if let Some(name) = providers.iter().find(|p| visited.contains(*p)) {
            return Some(Selection::AlreadyVisited(name));
        }
        providers.first().map(|name| Selection::Provider(name))
    }
}

/// Outcome of a capability lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    /// A provider is already part of the closure
    AlreadyVisited(&'a str),
    /// Provider to add to the closure
    Provider(&'a str),
}
