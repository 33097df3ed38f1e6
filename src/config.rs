// src/config.rs
//! Configuration file parsing
//!
//! Supports TOML configuration files with the following sections:
//! - [settings] - Download directory, download concurrency, HTTP timeout
//! - [distributions.*] - Distribution identifier to mirror mapping
//!
//! When no file is given, `$XDG_CONFIG_HOME/offpkg/config.toml` is used if it
//! exists, otherwise the built-in defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Package ecosystem served by a mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemType {
    /// RPM repodata (`repodata/repomd.xml`)
    Rpm,
    /// Debian `Packages.gz` index
    Deb,
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemType::Rpm => f.write_str("rpm"),
            SystemType::Deb => f.write_str("deb"),
        }
    }
}

impl FromStr for SystemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rpm" => Ok(SystemType::Rpm),
            "deb" => Ok(SystemType::Deb),
            other => Err(Error::ConfigError(format!(
                "Unsupported system type '{other}' (expected rpm or deb)"
            ))),
        }
    }
}

/// TOML configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    /// Distribution identifier (e.g. `centos-8`) to mirror
    #[serde(default = "default_distributions")]
    pub distributions: BTreeMap<String, Distribution>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            distributions: default_distributions(),
        }
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Where fetched packages and archives are written
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Number of concurrent package downloads
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Timeout applied to every HTTP request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Settings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// A distribution and the mirror serving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    #[serde(rename = "type")]
    pub system_type: SystemType,

    /// Human-readable name
    pub name: String,

    /// RPM: repository base (parent of `repodata/`).
    /// Debian: component directory under `dists/` (parent of `binary-<arch>/`).
    pub url: String,

    /// Debian architecture used when the request asks for `auto`
    #[serde(default)]
    pub arch: Option<String>,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent_downloads() -> usize {
    5
}

fn default_http_timeout_secs() -> u64 {
    60
}

fn default_distributions() -> BTreeMap<String, Distribution> {
    let mut distributions = BTreeMap::new();
    distributions.insert(
        "centos-7".to_string(),
        Distribution {
            system_type: SystemType::Rpm,
            name: "CentOS 7".to_string(),
            url: "https://mirrors.aliyun.com/centos/7/os/x86_64/".to_string(),
            arch: None,
        },
    );
    distributions.insert(
        "centos-8".to_string(),
        Distribution {
            system_type: SystemType::Rpm,
            name: "CentOS 8".to_string(),
            url: "https://mirrors.aliyun.com/centos/8/BaseOS/x86_64/os/".to_string(),
            arch: None,
        },
    );
    distributions.insert(
        "ubuntu-22".to_string(),
        Distribution {
            system_type: SystemType::Deb,
            name: "Ubuntu 22.04".to_string(),
            url: "http://archive.ubuntu.com/ubuntu/dists/jammy/main/".to_string(),
            arch: Some("amd64".to_string()),
        },
    );
    distributions
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&content)?;
        debug!(
            "Loaded {} distributions from {}",
            config.distributions.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else the per-user config file, else defaults
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::user_config_path() {
            Some(user_path) if user_path.is_file() => Self::load(&user_path),
            _ => Ok(Self::default()),
        }
    }

    /// `$XDG_CONFIG_HOME/offpkg/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("offpkg").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.settings.max_concurrent_downloads == 0 {
            return Err(Error::ConfigError(
                "max_concurrent_downloads must be at least 1".to_string(),
            ));
        }
        if self.settings.http_timeout_secs == 0 {
            return Err(Error::ConfigError("http_timeout_secs must be at least 1".to_string()));
        }
        for (id, dist) in &self.distributions {
            url::Url::parse(&dist.url).map_err(|e| {
                Error::ConfigError(format!("Distribution '{id}' has invalid url '{}': {e}", dist.url))
            })?;
            if dist.system_type == SystemType::Deb && !dist.url.contains("/dists/") {
                return Err(Error::ConfigError(format!(
                    "Distribution '{id}' url must point below a dists/ directory"
                )));
            }
        }
        Ok(())
    }

    /// Look up a distribution by identifier
    pub fn distribution(&self, id: &str) -> Result<&Distribution> {
        self.distributions
            .get(id)
            .ok_or_else(|| Error::UnknownDistribution(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_distributions() {
        let config = Config::default();
        assert_eq!(config.distributions.len(), 3);

        let centos = config.distribution("centos-8").unwrap();
        assert_eq!(centos.system_type, SystemType::Rpm);

        let ubuntu = config.distribution("ubuntu-22").unwrap();
        assert_eq!(ubuntu.system_type, SystemType::Deb);
        assert_eq!(ubuntu.arch.as_deref(), Some("amd64"));

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_distribution() {
        let config = Config::default();
        let err = config.distribution("gentoo").unwrap_err();
        assert!(matches!(err, Error::UnknownDistribution(ref id) if id == "gentoo"));
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [settings]
            download_dir = "/tmp/offpkg"
            max_concurrent_downloads = 8

            [distributions.rocky-9]
            type = "rpm"
            name = "Rocky Linux 9"
            url = "https://dl.rockylinux.org/pub/rocky/9/BaseOS/x86_64/os/"

            [distributions.debian-12]
            type = "deb"
            name = "Debian 12"
            url = "https://deb.debian.org/debian/dists/bookworm/main/"
            arch = "arm64"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.settings.download_dir, PathBuf::from("/tmp/offpkg"));
        assert_eq!(config.settings.max_concurrent_downloads, 8);
        assert_eq!(config.settings.http_timeout_secs, 60);
        assert_eq!(config.distributions.len(), 2);
        assert_eq!(config.distribution("debian-12").unwrap().arch.as_deref(), Some("arm64"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.settings.max_concurrent_downloads, 5);
        assert!(config.distributions.contains_key("centos-7"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let toml = "[settings]\nmax_concurrent_downloads = 0\n";
        assert!(matches!(Config::from_toml(toml), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_deb_url_requires_dists() {
        let toml = r#"
            [distributions.broken]
            type = "deb"
            name = "Broken"
            url = "http://archive.ubuntu.com/ubuntu/"
        "#;
        assert!(matches!(Config::from_toml(toml), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_system_type_from_str() {
        assert_eq!("rpm".parse::<SystemType>().unwrap(), SystemType::Rpm);
        assert_eq!("DEB".parse::<SystemType>().unwrap(), SystemType::Deb);
        assert!("pacman".parse::<SystemType>().is_err());
        assert_eq!(SystemType::Deb.to_string(), "deb");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[settings]\nhttp_timeout_secs = 5\n").unwrap();

        let config = Config::discover(Some(&path)).unwrap();
        assert_eq!(config.settings.http_timeout(), Duration::from_secs(5));

        let missing = dir.path().join("missing.toml");
        assert!(Config::load(&missing).is_err());
    }
}
