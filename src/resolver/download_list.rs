// src/resolver/download_list.rs

//! Download-list construction
//!
//! A concatenation of closures contains the same package many times.
//! These helpers keep the first occurrence and preserve order.

use crate::repository::PackageRecord;
use std::collections::HashSet;

/// Deduplicate by download URL; records without a URL are dropped
pub fn dedup_by_url(records: &[PackageRecord]) -> Vec<PackageRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| {
            record
                .download_url
                .as_deref()
                .is_some_and(|url| seen.insert(url.to_string()))
        })
        .cloned()
        .collect()
}

/// Deduplicate by package name, attaching the URL returned by `url_for`
pub fn dedup_by_name<F>(records: &[PackageRecord], url_for: F) -> Vec<PackageRecord>
where
    F: Fn(&str) -> Option<String>,
{
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert(record.name.clone()))
        .map(|record| {
            let mut record = record.clone();
            record.download_url = url_for(&record.name);
            record
        })
        .collect()
}
