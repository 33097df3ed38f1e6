// src/lib.rs

//! offpkg: offline dependency resolution for RPM and Debian mirrors
//!
//! Given a mirror and a list of package names, offpkg fetches the mirror's
//! own metadata (RPM repodata or a Debian `Packages` index), computes the
//! transitive dependency closure of the requested names and produces a
//! deduplicated download list. No local package database is consulted.
//!
//! # Architecture
//!
//! - `repository`: HTTP fetching, metadata parsers, package downloads
//! - `resolver`: capability index, per-ecosystem resolvers, download lists
//! - `session`: per-request orchestration (distribution → mirror → closure)
//! - `archive`: tarball packaging of downloaded packages

pub mod archive;
pub mod compression;
pub mod config;
mod error;
pub mod repository;
pub mod resolver;
pub mod session;

pub use config::{Config, Distribution, SystemType};
pub use error::{Error, Result};
pub use repository::{DebPackageParser, PackageIndex, PackageRecord, RepositoryClient, RpmRepodataParser};
pub use resolver::{CapabilityIndex, DebResolver, DependencyResolver, RpmResolver};
pub use session::{resolve_request, Resolution, ResolveRequest};
