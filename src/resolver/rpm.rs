// src/resolver/rpm.rs

//! RPM dependency resolver
//!
//! Requirements are matched against package names first and against the
//! shared-library [`CapabilityIndex`] second. Unresolvable requirements are
//! dropped with a debug log.

use super::capability::{CapabilityIndex, Selection};
use super::download_list::dedup_by_url;
use super::{walk_closure, DependencyResolver};
use crate::error::Result;
use crate::repository::parsers::fedora::RPMLIB_PREFIX;
use crate::repository::{PackageIndex, PackageRecord};
use std::collections::HashSet;
use tracing::debug;

/// Resolver over a parsed primary.xml index
#[derive(Debug)]
pub struct RpmResolver<'a> {
    index: &'a PackageIndex,
    capabilities: CapabilityIndex,
}

impl<'a> RpmResolver<'a> {
    /// Build the capability index once for the lifetime of the resolver
    pub fn new(index: &'a PackageIndex) -> Self {
        let capabilities = CapabilityIndex::build(index);
        debug!(
            "Capability index: {} library tokens from {} packages",
            capabilities.len(),
            index.len()
        );
        Self { index, capabilities }
    }

    pub fn capabilities(&self) -> &CapabilityIndex {
        &self.capabilities
    }

    /// Package satisfying one raw requirement, or `None` to skip it
    fn choose(&self, requirement: &str, visited: &HashSet<String>) -> Option<String> {
        if requirement.is_empty() || requirement.starts_with(RPMLIB_PREFIX) || requirement.starts_with('/') {
            return None;
        }

        if self.index.contains(requirement) {
            return Some(requirement.to_string());
        }

        match self.capabilities.select(requirement, visited) {
            Some(Selection::Provider(name)) => {
                debug!("{} provided by {}", requirement, name);
                Some(name.to_string())
            }
            Some(Selection::AlreadyVisited(name)) => {
                debug!("{} already satisfied by {}", requirement, name);
                None
            }
            None => {
                debug!("No package provides {}, dropping", requirement);
                None
            }
        }
    }
}

impl DependencyResolver for RpmResolver<'_> {
    fn resolve(&self, name: &str) -> Result<Vec<PackageRecord>> {
        walk_closure(self.index, name, |requirement, visited| self.choose(requirement, visited))
    }

    fn download_list(&self, records: &[PackageRecord]) -> Vec<PackageRecord> {
        dedup_by_url(records)
    }
}
