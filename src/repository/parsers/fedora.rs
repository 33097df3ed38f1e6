// src/repository/parsers/fedora.rs

//! RPM repodata parser
//!
//! Reads `repodata/repomd.xml` to find the primary metadata document, then
//! walks every `<package>` element of `primary.xml` with a streaming
//! quick-xml reader. Element prefixes are ignored and matched by local name,
//! so the `common` and `rpm` namespaces need no special handling.
//!
//! A broken `<package>` entry is skipped on its own; the rest of the
//! document is still parsed.

use crate::error::{Error, Result};
use crate::repository::client::RepositoryClient;
use crate::repository::parsers::{PackageIndex, PackageRecord};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info, warn};
use url::Url;

/// Architecture assumed when a package has no `<arch>` element
pub const DEFAULT_ARCH: &str = "x86_64";

/// Version used when a package has no `<version ver=..>`
pub const UNKNOWN_VERSION: &str = "unknown";

/// Requirement prefix for rpm's internal feature markers
pub const RPMLIB_PREFIX: &str = "rpmlib(";

/// Parser for one RPM mirror's repodata
#[derive(Debug)]
pub struct RpmRepodataParser {
    mirror_url: Url,
    arch_filter: Option<String>,
    primary_xml: Option<String>,
    index: PackageIndex,
}

impl RpmRepodataParser {
    /// Create a parser for the repository rooted at `mirror_url`
    ///
    /// The URL is normalized to end with `/` so that relative `href`s
    /// resolve beneath it.
    pub fn new(mirror_url: &str) -> Result<Self> {
        let normalized = format!("{}/", mirror_url.trim_end_matches('/'));
        let mirror_url = Url::parse(&normalized)
            .map_err(|e| Error::ConfigError(format!("Invalid mirror URL '{mirror_url}': {e}")))?;

        Ok(Self {
            mirror_url,
            arch_filter: None,
            primary_xml: None,
            index: PackageIndex::new(),
        })
    }

    /// Keep only packages built for `arch` (and `noarch`) when parsing
    pub fn with_arch_filter(mut self, arch: impl Into<String>) -> Self {
        self.arch_filter = Some(arch.into());
        self
    }

    pub fn mirror_url(&self) -> &str {
        self.mirror_url.as_str()
    }

    /// Fetch repomd.xml and the primary metadata document it points to
    pub fn load_metadata(&mut self, client: &RepositoryClient) -> Result<()> {
        let repomd_url = self.join("repodata/repomd.xml")?;
        info!("Fetching repository index {}", repomd_url);

        let repomd = client.fetch_and_decompress_string(&repomd_url)?;
        let primary_href = parse_primary_location(&repomd)?;
        let primary_url = self.join(&primary_href)?;

        info!("Fetching primary metadata {}", primary_url);
        self.primary_xml = Some(client.fetch_and_decompress_string(&primary_url)?);
        Ok(())
    }

    /// Use an already fetched primary document instead of the network
    pub fn load_primary_xml(&mut self, xml: impl Into<String>) {
        self.primary_xml = Some(xml.into());
    }

    /// Parse the loaded primary document into the package index
    ///
    /// Returns the number of packages in the index.
    pub fn parse_packages(&mut self) -> Result<usize> {
        let xml = self.primary_xml.as_deref().ok_or_else(|| {
            Error::MetadataError("Metadata not loaded; call load_metadata() first".to_string())
        })?;

        self.index = parse_primary(xml, &self.mirror_url, self.arch_filter.as_deref())?;
        Ok(self.index.len())
    }

    pub fn find_package(&self, name: &str) -> Option<&PackageRecord> {
        self.index.get(name)
    }

    pub fn index(&self) -> &PackageIndex {
        &self.index
    }

    pub fn into_index(self) -> PackageIndex {
        self.index
    }

    fn join(&self, href: &str) -> Result<String> {
        self.mirror_url
            .join(href)
            .map(String::from)
            .map_err(|e| Error::MetadataError(format!("Cannot resolve '{href}' against mirror: {e}")))
    }
}

/// Read the value of the attribute whose local name is `key`
fn attr_value(element: &BytesStart<'_>, key: &[u8]) -> std::result::Result<Option<String>, String> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.local_name().as_ref() == key {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Find `location/@href` of the `<data type="primary">` element in repomd.xml
pub fn parse_primary_location(repomd: &str) -> Result<String> {
    let mut reader = Reader::from_str(repomd);
    reader.trim_text(true);

    let mut in_primary = false;
    let mut saw_primary = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"data" => {
                let data_type = attr_value(&e, b"type").map_err(Error::MetadataError)?;
                in_primary = data_type.as_deref() == Some("primary");
                saw_primary |= in_primary;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"data" => in_primary = false,
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if in_primary && e.local_name().as_ref() == b"location" =>
            {
                if let Some(href) = attr_value(&e, b"href").map_err(Error::MetadataError)? {
                    debug!("Primary metadata location: {}", href);
                    return Ok(href);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::MetadataError(format!(
                    "Malformed repomd.xml at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }

    if saw_primary {
        Err(Error::MetadataError("Primary metadata has no location in repomd.xml".to_string()))
    } else {
        Err(Error::MetadataError("Primary metadata not found in repomd.xml".to_string()))
    }
}

/// Text-bearing child elements of `<package>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Name,
    Arch,
    Sha256,
}

/// Dependency lists inside `<format>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryList {
    Requires,
    Provides,
}

/// Fields collected while inside one `<package>` element
#[derive(Debug, Default)]
struct PackageBuilder {
    name: Option<String>,
    arch: Option<String>,
    version: Option<String>,
    location: Option<String>,
    sha256: Option<String>,
    size: Option<u64>,
    requires: Vec<String>,
    provides: Vec<String>,
    error: Option<String>,
}

impl PackageBuilder {
    fn fail(&mut self, reason: String) {
        self.error.get_or_insert(reason);
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }

    /// Turn the collected fields into a record
    ///
    /// `Ok(None)` means the entry is intentionally skipped.
    fn finish(self, base: &Url, arch_filter: Option<&str>) -> std::result::Result<Option<PackageRecord>, String> {
        if let Some(reason) = self.error {
            return Err(reason);
        }

        let Some(name) = self.name.filter(|n| !n.is_empty()) else {
            debug!("Skipping package entry without a name");
            return Ok(None);
        };
        let Some(href) = self.location else {
            debug!("Skipping package {} without a location", name);
            return Ok(None);
        };

        let arch = self.arch.unwrap_or_else(|| DEFAULT_ARCH.to_string());
        if let Some(wanted) = arch_filter
            && arch != wanted
            && arch != "noarch"
        {
            return Ok(None);
        }

        let download_url = base
            .join(&href)
            .map_err(|e| format!("invalid location '{href}': {e}"))?;

        Ok(Some(PackageRecord {
            name,
            version: self.version.unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            arch,
            download_url: Some(download_url.into()),
            requires: self
                .requires
                .into_iter()
                .filter(|req| !req.starts_with(RPMLIB_PREFIX))
                .collect(),
            provides: self.provides,
            sha256: self.sha256,
            size: self.size,
        }))
    }
}

/// Walker state for the primary document
#[derive(Debug, Default)]
struct PrimaryWalker {
    current: Option<PackageBuilder>,
    /// Element depth below the current `<package>`
    depth: usize,
    text: Option<TextField>,
    list: Option<EntryList>,
}

impl PrimaryWalker {
    fn open(&mut self, element: &BytesStart<'_>, depth: usize) {
        let Some(pkg) = self.current.as_mut() else {
            return;
        };
        let local = element.local_name();

        match (depth, local.as_ref()) {
            (1, b"name") => self.text = Some(TextField::Name),
            (1, b"arch") => self.text = Some(TextField::Arch),
            (1, b"checksum") => match attr_value(element, b"type") {
                Ok(Some(kind)) if kind == "sha256" => self.text = Some(TextField::Sha256),
                Ok(_) => {}
                Err(e) => pkg.fail(e),
            },
            (1, b"version") => match attr_value(element, b"ver") {
                Ok(ver) => pkg.version = ver,
                Err(e) => pkg.fail(e),
            },
            (1, b"location") => match attr_value(element, b"href") {
                Ok(href) => pkg.location = href,
                Err(e) => pkg.fail(e),
            },
            (1, b"size") => match attr_value(element, b"package") {
                Ok(Some(size)) => pkg.size = size.parse().ok(),
                Ok(None) => {}
                Err(e) => pkg.fail(e),
            },
            (2, b"requires") => self.list = Some(EntryList::Requires),
            (2, b"provides") => self.list = Some(EntryList::Provides),
            (3, b"entry") => {
                let Some(list) = self.list else {
                    return;
                };
                match attr_value(element, b"name") {
                    Ok(Some(entry)) if !entry.is_empty() => match list {
                        EntryList::Requires => pkg.requires.push(entry),
                        EntryList::Provides => pkg.provides.push(entry),
                    },
                    Ok(_) => {}
                    Err(e) => pkg.fail(e),
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, value: std::result::Result<String, String>) {
        let (Some(pkg), Some(field)) = (self.current.as_mut(), self.text) else {
            return;
        };
        match value {
            Ok(value) => match field {
                TextField::Name => pkg.name = Some(value),
                TextField::Arch => pkg.arch = Some(value),
                TextField::Sha256 => pkg.sha256 = Some(value.to_ascii_lowercase()),
            },
            Err(e) => pkg.fail(e),
        }
    }

    fn close(&mut self, local: &[u8]) {
        self.text = None;
        if self.depth == 2 && (local == b"requires" || local == b"provides") {
            self.list = None;
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn abandon(&mut self, reason: String) {
        if let Some(pkg) = self.current.take() {
            warn!("Skipping malformed package entry {}: {}", pkg.label(), reason);
        }
        self.depth = 0;
        self.text = None;
        self.list = None;
    }
}

/// Byte offset of the next `<package` start tag at or after `from`
fn next_package_start(xml: &str, from: usize) -> Option<usize> {
    const TAG: &[u8] = b"<package";
    let bytes = xml.as_bytes();
    let mut cursor = from;
    while let Some(found) = bytes.get(cursor..)?.windows(TAG.len()).position(|w| w == TAG) {
        let at = cursor + found;
        match bytes.get(at + TAG.len()) {
            Some(b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n') => return Some(at),
            _ => cursor = at + 1,
        }
    }
    None
}

/// Parse a primary.xml document into a package index
///
/// Download URLs are resolved against `base`. With `arch_filter`, only
/// packages for that architecture or `noarch` are kept.
///
/// quick-xml stops at the first syntax error, so after one the reader is
/// restarted at the next `<package` tag and the broken entry is skipped.
pub fn parse_primary(xml: &str, base: &Url, arch_filter: Option<&str>) -> Result<PackageIndex> {
    let mut index = PackageIndex::new();
    let mut walker = PrimaryWalker::default();
    let mut saw_root = false;
    let mut skipped = 0usize;
    let mut offset = 0usize;

    'segments: loop {
        let mut reader = Reader::from_str(&xml[offset..]);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let local = e.local_name();
                    if local.as_ref() == b"metadata" && walker.current.is_none() {
                        saw_root = true;
                    } else if local.as_ref() == b"package" && walker.current.is_none() {
                        walker.current = Some(PackageBuilder::default());
                        walker.depth = 0;
                    } else if walker.current.is_some() {
                        walker.depth += 1;
                        walker.open(&e, walker.depth);
                    }
                }
                Ok(Event::Empty(e)) => {
                    if walker.current.is_some() {
                        walker.open(&e, walker.depth + 1);
                    }
                }
                Ok(Event::Text(t)) => {
                    if walker.current.is_some() && walker.text.is_some() {
                        walker.text(t.unescape().map(|v| v.into_owned()).map_err(|e| e.to_string()));
                    }
                }
                Ok(Event::End(e)) => {
                    if walker.current.is_none() {
                        continue;
                    }
                    let local = e.local_name();
                    if walker.depth == 0 && local.as_ref() == b"package" {
                        if let Some(pkg) = walker.current.take() {
                            let label = pkg.label().to_string();
                            match pkg.finish(base, arch_filter) {
                                Ok(Some(record)) => index.insert(record),
                                Ok(None) => skipped += 1,
                                Err(reason) => {
                                    warn!("Skipping malformed package entry {}: {}", label, reason);
                                    skipped += 1;
                                }
                            }
                        }
                    } else {
                        walker.close(local.as_ref());
                    }
                }
                Ok(Event::Eof) => break 'segments,
                Ok(_) => {}
                Err(e) => {
                    let position = offset + reader.buffer_position();
                    if walker.current.is_none() && !saw_root {
                        return Err(Error::MetadataError(format!(
                            "Malformed primary metadata at byte {position}: {e}"
                        )));
                    }
                    if walker.current.is_some() {
                        walker.abandon(e.to_string());
                        skipped += 1;
                    }
                    match next_package_start(xml, position.max(offset + 1)) {
                        Some(next) => {
                            debug!("Resuming primary metadata at byte {} after: {}", next, e);
                            offset = next;
                            continue 'segments;
                        }
                        None => break 'segments,
                    }
                }
            }
        }
    }

    if !saw_root {
        return Err(Error::MetadataError(
            "Primary metadata has no <metadata> root element".to_string(),
        ));
    }

    info!("Parsed {} packages from primary metadata ({} skipped)", index.len(), skipped);
    Ok(index)
}
