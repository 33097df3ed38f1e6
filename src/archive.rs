// src/archive.rs

//! Tarball packaging of downloaded packages

use crate::error::{Error, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `<prefix>-YYYYmmdd-HHMMSS.tar.gz` for the current local time
pub fn archive_name(prefix: &str) -> String {
    format!("{}-{}.tar.gz", prefix, chrono::Local::now().format("%Y%m%d-%H%M%S"))
}

/// Create a new, empty directory `<parent>/<stem>` for one fetch run
///
/// An existing directory is never reused: `-1`, `-2`, ... is appended to
/// `stem` until the name is free.
pub fn create_run_dir(parent: &Path, stem: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(parent)
        .map_err(|e| Error::IoError(format!("Failed to create directory {}: {e}", parent.display())))?;

    let mut suffix = 0u32;
    loop {
        let name = if suffix == 0 {
            stem.to_string()
        } else {
            format!("{stem}-{suffix}")
        };
        let path = parent.join(name);
        match std::fs::create_dir(&path) {
            Ok(()) => {
                debug!("Created run directory {}", path.display());
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to create directory {}: {e}",
                    path.display()
                )));
            }
        }
    }
}

/// Write a gzip tar of `source_dir`, stored under `arcname`
///
/// Returns the size of the archive in bytes.
pub fn create_tarball(source_dir: &Path, dest_path: &Path, arcname: &str) -> Result<u64> {
    if !source_dir.is_dir() {
        return Err(Error::IoError(format!("{} is not a directory", source_dir.display())));
    }
    if let Some(parent) = dest_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::IoError(format!("Failed to create directory {}: {e}", parent.display()))
        })?;
    }

    let file = File::create(dest_path)
        .map_err(|e| Error::IoError(format!("Failed to create {}: {e}", dest_path.display())))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(arcname, source_dir)
        .map_err(|e| Error::IoError(format!("Failed to archive {}: {e}", source_dir.display())))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::IoError(format!("Failed to finish archive: {e}")))?;
    encoder
        .finish()
        .map_err(|e| Error::IoError(format!("Failed to finish archive: {e}")))?;

    let size = std::fs::metadata(dest_path)
        .map_err(|e| Error::IoError(format!("Failed to stat {}: {e}", dest_path.display())))?
        .len();
    info!("Created {} ({} bytes)", dest_path.display(), size);
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    #[test]
    fn test_archive_name() {
        let name = archive_name("centos-8");
        assert!(name.starts_with("centos-8-"));
        assert!(name.ends_with(".tar.gz"));
        // centos-8- + YYYYmmdd-HHMMSS + .tar.gz
        assert_eq!(name.len(), "centos-8-".len() + 15 + ".tar.gz".len());
    }

    #[test]
    fn test_create_tarball() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("packages");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("bash-5.1.rpm"), b"bash").unwrap();
        std::fs::write(source.join("glibc-2.28.rpm"), b"glibc").unwrap();

        let dest = dir.path().join("out").join("bundle.tar.gz");
        let size = create_tarball(&source, &dest, "bundle").unwrap();
        assert_eq!(size, std::fs::metadata(&dest).unwrap().len());

        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&dest).unwrap()));
        let mut entries: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|entry| entry.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert!(entries.contains(&"bundle/bash-5.1.rpm".to_string()));
        assert!(entries.contains(&"bundle/glibc-2.28.rpm".to_string()));
    }

    #[test]
    fn test_run_dirs_are_never_reused() {
        let dir = tempfile::tempdir().unwrap();
        let first = create_run_dir(dir.path(), "centos-8-20240101-000000").unwrap();
        std::fs::write(first.join("stale-1.0.rpm"), b"old").unwrap();

        let second = create_run_dir(dir.path(), "centos-8-20240101-000000").unwrap();
        assert_eq!(second, dir.path().join("centos-8-20240101-000000-1"));
        assert_eq!(std::fs::read_dir(&second).unwrap().count(), 0);

        let dest = dir.path().join("second.tar.gz");
        create_tarball(&second, &dest, "second").unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(&dest).unwrap()));
        let stale = archive
            .entries()
            .unwrap()
            .any(|entry| entry.unwrap().path().unwrap().ends_with("stale-1.0.rpm"));
        assert!(!stale);
    }

    #[test]
    fn test_missing_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = create_tarball(&dir.path().join("absent"), &dir.path().join("x.tar.gz"), "x");
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
