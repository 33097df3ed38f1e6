// src/resolver/mod.rs

//! Transitive dependency resolution over a parsed package index
//!
//! Both ecosystems share the same traversal: an explicit work-list of
//! pending requirement strings plus a visited set. Each requirement is
//! mapped to a package name only when it is popped, so a choice can see
//! everything visited before it. The result is the depth-first pre-order
//! closure of the requested package.

mod capability;
mod deb;
mod download_list;
mod rpm;

pub use capability::{capability_candidates, CapabilityIndex, Selection};
pub use deb::{dependency_names, DebResolver};
pub use download_list::{dedup_by_name, dedup_by_url};
pub use rpm::RpmResolver;

use crate::error::{Error, Result};
use crate::repository::{PackageIndex, PackageRecord};
use std::collections::HashSet;
use tracing::{debug, info};

/// Common interface of the per-ecosystem resolvers
pub trait DependencyResolver {
    /// Closure of `name`, in depth-first pre-order starting with `name`
    ///
    /// Fails with [`Error::PackageNotFound`] when `name` is not in the index.
    fn resolve(&self, name: &str) -> Result<Vec<PackageRecord>>;

    /// Deduplicated list of packages to download, in first-seen order
    fn download_list(&self, records: &[PackageRecord]) -> Vec<PackageRecord>;

    /// Resolve several names, concatenating their closures
    ///
    /// Names absent from the index are collected in the second element
    /// instead of failing the batch.
    fn resolve_all(&self, names: &[String]) -> Result<(Vec<PackageRecord>, Vec<String>)> {
        let mut resolved = Vec::new();
        let mut missing = Vec::new();

        for name in names {
            match self.resolve(name) {
                Ok(records) => {
                    info!("Resolved {} to {} packages", name, records.len());
                    resolved.extend(records);
                }
                Err(e) if e.is_not_found() => {
                    info!("Package {} not found in index", name);
                    missing.push(name.clone());
                }
                Err(e) => return Err(e),
            }
        }

        Ok((resolved, missing))
    }
}

/// Walk the requirement graph from `root`
///
/// `choose` maps a raw requirement to the package that satisfies it, given
/// the names visited so far. Returning `None` drops the requirement.
pub(crate) fn walk_closure<F>(index: &PackageIndex, root: &str, mut choose: F) -> Result<Vec<PackageRecord>>
where
    F: FnMut(&str, &HashSet<String>) -> Option<String>,
{
    let root_record = index
        .get(root)
        .ok_or_else(|| Error::PackageNotFound(root.to_string()))?;

    let mut visited: HashSet<String> = HashSet::new();
    let mut closure = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    visit(root_record, &mut visited, &mut closure, &mut pending);

    while let Some(requirement) = pending.pop() {
        let Some(name) = choose(requirement, &visited) else {
            continue;
        };
        if visited.contains(&name) {
            continue;
        }
        match index.get(&name) {
            Some(record) => visit(record, &mut visited, &mut closure, &mut pending),
            None => debug!("Dropping {}: {} is not in the index", requirement, name),
        }
    }

    Ok(closure)
}

fn visit<'a>(
    record: &'a PackageRecord,
    visited: &mut HashSet<String>,
    closure: &mut Vec<PackageRecord>,
    pending: &mut Vec<&'a str>,
) {
    visited.insert(record.name.clone());
    closure.push(record.clone());
    pending.extend(record.requires.iter().rev().map(String::as_str));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, requires: &[&str]) -> PackageRecord {
        let mut record = PackageRecord::new(name, "1.0", "x86_64");
        record.requires = requires.iter().map(|r| r.to_string()).collect();
        record
    }

    fn by_name(requirement: &str, _: &HashSet<String>) -> Option<String> {
        Some(requirement.to_string())
    }

    fn names(records: &[PackageRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_walk_preorder() {
        let index: PackageIndex = vec![
            package("a", &["b", "c"]),
            package("b", &["d"]),
            package("c", &["d"]),
            package("d", &[]),
        ]
        .into_iter()
        .collect();

        let closure = walk_closure(&index, "a", by_name).unwrap();
        assert_eq!(names(&closure), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_walk_cycle_terminates() {
        let index: PackageIndex = vec![package("a", &["b"]), package("b", &["a"])]
            .into_iter()
            .collect();

        let closure = walk_closure(&index, "b", by_name).unwrap();
        assert_eq!(names(&closure), vec!["b", "a"]);
    }

    #[test]
    fn test_walk_missing_root() {
        let index = PackageIndex::new();
        let err = walk_closure(&index, "nonexistent-xyz", by_name).unwrap_err();
        assert!(matches!(err, Error::PackageNotFound(ref name) if name == "nonexistent-xyz"));
    }

    #[test]
    fn test_walk_drops_unknown_requirements() {
        let index: PackageIndex = vec![package("a", &["ghost", "b"]), package("b", &[])]
            .into_iter()
            .collect();

        let closure = walk_closure(&index, "a", by_name).unwrap();
        assert_eq!(names(&closure), vec!["a", "b"]);
    }

    #[test]
    fn test_choose_sees_earlier_siblings() {
        let index: PackageIndex = vec![
            package("a", &["b", "either"]),
            package("b", &["c"]),
            package("c", &[]),
            package("d", &[]),
        ]
        .into_iter()
        .collect();

        // "either" is satisfied by c when c was already pulled in, else by d
        let closure = walk_closure(&index, "a", |req, visited| match req {
            "either" if visited.contains("c") => None,
            "either" => Some("d".to_string()),
            other => Some(other.to_string()),
        })
        .unwrap();
        assert_eq!(names(&closure), vec!["a", "b", "c"]);
    }
}
