// src/session.rs

//! Resolution sessions
//!
//! A session takes one request (distribution, architecture, package names),
//! fetches that distribution's metadata afresh, resolves every requested
//! name and returns the deduplicated download list. Nothing is cached
//! between sessions.

use crate::config::{Config, Distribution, SystemType};
use crate::error::{Error, Result};
use crate::repository::{DebPackageParser, PackageRecord, RepositoryClient, RpmRepodataParser};
use crate::resolver::{DebResolver, DependencyResolver, RpmResolver};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Architecture value that defers to the distribution's default
pub const AUTO_ARCH: &str = "auto";

/// Debian architecture used when neither request nor distribution names one
const DEFAULT_DEB_ARCH: &str = "amd64";

/// One resolution request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub system_type: SystemType,
    /// Distribution identifier from the configuration
    pub distribution: String,
    /// `auto`, an RPM architecture (`x86_64`) or a Debian one (`amd64`)
    pub arch: String,
    pub packages: Vec<String>,
}

/// Result of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub system_type: SystemType,
    /// RPM repository base or Debian `binary-<arch>/` directory
    pub mirror_url: String,
    /// Deduplicated download list
    pub packages: Vec<PackageRecord>,
    /// Requested names absent from the index
    pub missing: Vec<String>,
}

impl Resolution {
    /// Sum of published package sizes
    pub fn total_size(&self) -> u64 {
        self.packages.iter().filter_map(|p| p.size).sum()
    }
}

/// Debian architecture for a requested one
///
/// `x86_64`, `aarch64` and `noarch` map to their Debian names; `auto`
/// defers to the distribution (then `amd64`); anything else is used as is.
pub fn deb_arch(requested: &str, distribution: &Distribution) -> String {
    match requested {
        "x86_64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        "noarch" => "all".to_string(),
        AUTO_ARCH | "" => distribution
            .arch
            .clone()
            .unwrap_or_else(|| DEFAULT_DEB_ARCH.to_string()),
        other => other.to_string(),
    }
}

/// RPM architecture filter for a requested one
///
/// Debian names map back to RPM ones; `auto` (or empty) means no filter.
pub fn rpm_arch(requested: &str) -> Option<String> {
    match requested {
        AUTO_ARCH | "" => None,
        "amd64" => Some("x86_64".to_string()),
        "arm64" => Some("aarch64".to_string()),
        "all" => Some("noarch".to_string()),
        other => Some(other.to_string()),
    }
}

/// URL of the `binary-<arch>/` index directory below a distribution URL
pub fn deb_index_url(distribution: &Distribution, arch: &str) -> String {
    format!("{}/binary-{}/", distribution.url.trim_end_matches('/'), arch)
}

fn validate(config: &Config, request: &ResolveRequest) -> Result<Distribution> {
    if request.packages.iter().all(|name| name.trim().is_empty()) {
        return Err(Error::ConfigError("No packages requested".to_string()));
    }

    let distribution = config.distribution(&request.distribution)?;
    if distribution.system_type != request.system_type {
        return Err(Error::ConfigError(format!(
            "Distribution '{}' is a {} distribution, not {}",
            request.distribution, distribution.system_type, request.system_type
        )));
    }

    Ok(distribution.clone())
}

/// Run one resolution session
pub fn resolve_request(client: &RepositoryClient, config: &Config, request: &ResolveRequest) -> Result<Resolution> {
    let distribution = validate(config, request)?;
    let names: Vec<String> = request
        .packages
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    info!(
        "Resolving {} packages for {} ({})",
        names.len(),
        distribution.name,
        request.system_type
    );

    let (mirror_url, packages, missing) = match request.system_type {
        SystemType::Rpm => {
            let mut parser = RpmRepodataParser::new(&distribution.url)?;
            if let Some(arch) = rpm_arch(&request.arch) {
                parser = parser.with_arch_filter(arch);
            }
            parser.load_metadata(client)?;
            parser.parse_packages()?;

            let resolver = RpmResolver::new(parser.index());
            let (records, missing) = resolver.resolve_all(&names)?;
            (parser.mirror_url().to_string(), resolver.download_list(&records), missing)
        }
        SystemType::Deb => {
            let arch = deb_arch(&request.arch, &distribution);
            let mut parser = DebPackageParser::new(&deb_index_url(&distribution, &arch));
            parser.load_packages(client)?;

            let resolver = DebResolver::new(&parser);
            let (records, missing) = resolver.resolve_all(&names)?;
            (parser.mirror_url().to_string(), resolver.download_list(&records), missing)
        }
    };

    if !missing.is_empty() {
        warn!("Packages not found: {}", missing.join(", "));
    }
    info!("Download list contains {} packages", packages.len());

    Ok(Resolution {
        system_type: request.system_type,
        mirror_url,
        packages,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system_type: SystemType, distribution: &str, packages: &[&str]) -> ResolveRequest {
        ResolveRequest {
            system_type,
            distribution: distribution.to_string(),
            arch: AUTO_ARCH.to_string(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_deb_arch_mapping() {
        let config = Config::default();
        let ubuntu = config.distribution("ubuntu-22").unwrap();

        assert_eq!(deb_arch("x86_64", ubuntu), "amd64");
        assert_eq!(deb_arch("aarch64", ubuntu), "arm64");
        assert_eq!(deb_arch("noarch", ubuntu), "all");
        assert_eq!(deb_arch("auto", ubuntu), "amd64");
        assert_eq!(deb_arch("i386", ubuntu), "i386");

        let mut no_default = ubuntu.clone();
        no_default.arch = None;
        assert_eq!(deb_arch("auto", &no_default), "amd64");
    }

    #[test]
    fn test_rpm_arch_mapping() {
        assert_eq!(rpm_arch("auto"), None);
        assert_eq!(rpm_arch(""), None);
        assert_eq!(rpm_arch("amd64").as_deref(), Some("x86_64"));
        assert_eq!(rpm_arch("arm64").as_deref(), Some("aarch64"));
        assert_eq!(rpm_arch("all").as_deref(), Some("noarch"));
        assert_eq!(rpm_arch("x86_64").as_deref(), Some("x86_64"));
        assert_eq!(rpm_arch("ppc64le").as_deref(), Some("ppc64le"));
    }

    #[test]
    fn test_deb_index_url() {
        let config = Config::default();
        let ubuntu = config.distribution("ubuntu-22").unwrap();
        assert_eq!(
            deb_index_url(ubuntu, "arm64"),
            "http://archive.ubuntu.com/ubuntu/dists/jammy/main/binary-arm64/"
        );
    }

    #[test]
    fn test_empty_package_list_rejected() {
        let client = RepositoryClient::new().unwrap();
        let result = resolve_request(&client, &Config::default(), &request(SystemType::Rpm, "centos-8", &[" "]));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_unknown_distribution() {
        let client = RepositoryClient::new().unwrap();
        let result = resolve_request(&client, &Config::default(), &request(SystemType::Rpm, "gentoo", &["bash"]));
        assert!(matches!(result, Err(Error::UnknownDistribution(_))));
    }

    #[test]
    fn test_system_type_mismatch() {
        let client = RepositoryClient::new().unwrap();
        let result = resolve_request(&client, &Config::default(), &request(SystemType::Deb, "centos-8", &["bash"]));
        assert!(matches!(result, Err(Error::ConfigError(msg)) if msg.contains("centos-8")));
    }

    #[test]
    fn test_total_size() {
        let mut a = PackageRecord::new("a", "1", "x86_64");
        a.size = Some(10);
        let b = PackageRecord::new("b", "1", "x86_64");
        let resolution = Resolution {
            system_type: SystemType::Rpm,
            mirror_url: "http://m/".to_string(),
            packages: vec![a, b],
            missing: Vec::new(),
        };
        assert_eq!(resolution.total_size(), 10);
    }
}
