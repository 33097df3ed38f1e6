// tests/common/mod.rs

//! Shared test utilities: metadata fixtures and mock mirrors.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use mockito::{Mock, ServerGuard};
use offpkg::config::{Distribution, Settings};
use offpkg::{Config, SystemType};
use std::collections::BTreeMap;
use std::io::Write;

/// Identifier of the single distribution in [`single_distribution_config`]
pub const TEST_DIST: &str = "test-dist";

pub const PRIMARY_HREF: &str = "repodata/0123abcd-primary.xml.gz";

/// Gzip-compress a document
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// `repomd.xml` pointing at `primary_href`
pub fn repomd_xml(primary_href: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
  <revision>1700000000</revision>
  <data type="other">
    <location href="repodata/0123abcd-other.xml.gz"/>
  </data>
  <data type="primary">
    <checksum type="sha256">0123abcd</checksum>
    <location href="{primary_href}"/>
  </data>
</repomd>"#
    )
}

/// One `<package>` element of primary.xml
pub fn rpm_package(name: &str, arch: &str, requires: &[&str], provides: &[&str]) -> String {
    let entries = |names: &[&str]| -> String {
        names
            .iter()
            .map(|n| format!("      <rpm:entry name=\"{n}\"/>\n"))
            .collect()
    };
    format!(
        r#"<package type="rpm">
  <name>{name}</name>
  <arch>{arch}</arch>
  <version epoch="0" ver="1.0" rel="1"/>
  <location href="Packages/{name}-1.0-1.{arch}.rpm"/>
  <format>
    <rpm:provides>
{provides}    </rpm:provides>
    <rpm:requires>
{requires}    </rpm:requires>
  </format>
</package>
"#,
        provides = entries(provides),
        requires = entries(requires),
    )
}

/// primary.xml wrapping the given `<package>` elements
pub fn primary_xml(packages: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <metadata xmlns=\"http://linux.duke.edu/metadata/common\" \
         xmlns:rpm=\"http://linux.duke.edu/metadata/rpm\" packages=\"{}\">\n{}</metadata>\n",
        packages.len(),
        packages.concat()
    )
}

/// One stanza of a Debian `Packages` index
pub fn deb_stanza(name: &str, depends: Option<&str>) -> String {
    let mut stanza = format!("Package: {name}\nVersion: 1.0-1\nArchitecture: amd64\n");
    if let Some(depends) = depends {
        stanza.push_str(&format!("Depends: {depends}\n"));
    }
    stanza.push_str(&format!(
        "Filename: pool/main/{initial}/{name}/{name}_1.0-1_amd64.deb\nDescription: {name}\n\n",
        initial = &name[..1]
    ));
    stanza
}

/// Serve repomd.xml and a gzipped primary.xml below `/<prefix>/`
pub fn serve_rpm_mirror(server: &mut ServerGuard, prefix: &str, primary: &str) -> Vec<Mock> {
    vec![
        server
            .mock("GET", format!("/{prefix}/repodata/repomd.xml").as_str())
            .with_body(repomd_xml(PRIMARY_HREF))
            .create(),
        server
            .mock("GET", format!("/{prefix}/{PRIMARY_HREF}").as_str())
            .with_body(gzip(primary.as_bytes()))
            .create(),
    ]
}

/// Serve a gzipped `Packages` index at `/ubuntu/dists/jammy/main/binary-<arch>/Packages.gz`
pub fn serve_deb_index(server: &mut ServerGuard, arch: &str, packages: &str) -> Mock {
    server
        .mock(
            "GET",
            format!("/ubuntu/dists/jammy/main/binary-{arch}/Packages.gz").as_str(),
        )
        .with_body(gzip(packages.as_bytes()))
        .create()
}

/// Configuration with one distribution named [`TEST_DIST`]
pub fn single_distribution_config(system_type: SystemType, url: &str, arch: Option<&str>) -> Config {
    let mut distributions = BTreeMap::new();
    distributions.insert(
        TEST_DIST.to_string(),
        Distribution {
            system_type,
            name: "Test Distribution".to_string(),
            url: url.to_string(),
            arch: arch.map(str::to_string),
        },
    );
    Config {
        settings: Settings::default(),
        distributions,
    }
}
