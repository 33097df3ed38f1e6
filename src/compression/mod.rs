// src/compression/mod.rs
//! Decompression of repository metadata documents
//!
//! Mirrors publish `primary.xml` as gzip (CentOS, RHEL), xz or zstd (newer
//! Fedora), and `Packages` as gzip. The format is detected from magic bytes
//! rather than the URL, since `repomd.xml` locations are not always suffixed.

use std::io::{self, Read};
use thiserror::Error;

/// Decompression errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to create {format} decoder: {source}")]
    DecoderCreation {
        format: &'static str,
        source: io::Error,
    },

    #[error("Failed to decompress {format} data: {source}")]
    Decompression {
        format: &'static str,
        source: io::Error,
    },
}

/// Compression formats found on package mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain document
    None,
    /// `.gz`
    Gzip,
    /// `.xz`
    Xz,
    /// `.zst`
    Zstd,
}

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

impl CompressionFormat {
    /// Detect the compression format from the leading bytes of a document
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(GZIP_MAGIC) {
            Self::Gzip
        } else if data.starts_with(XZ_MAGIC) {
            Self::Xz
        } else if data.starts_with(ZSTD_MAGIC) {
            Self::Zstd
        } else {
            Self::None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn decoder<'a>(data: &'a [u8], format: CompressionFormat) -> Result<Box<dyn Read + 'a>, CompressionError> {
    match format {
        CompressionFormat::None => Ok(Box::new(data)),
        CompressionFormat::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(data))),
        CompressionFormat::Xz => Ok(Box::new(xz2::read::XzDecoder::new(data))),
        CompressionFormat::Zstd => {
            let decoder = zstd::Decoder::new(data).map_err(|source| CompressionError::DecoderCreation {
                format: "zstd",
                source,
            })?;
            Ok(Box::new(decoder))
        }
    }
}

/// Decompress `data` in the format given by its magic bytes
///
/// Uncompressed input is returned unchanged.
pub fn decompress_auto(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let format = CompressionFormat::from_magic_bytes(data);
    let mut output = Vec::with_capacity(data.len() * 4);
    decoder(data, format)?
        .read_to_end(&mut output)
        .map_err(|source| CompressionError::Decompression {
            format: format.name(),
            source,
        })?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            CompressionFormat::from_magic_bytes(&[0x1f, 0x8b, 0x08, 0x00]),
            CompressionFormat::Gzip
        );
        assert_eq!(
            CompressionFormat::from_magic_bytes(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]),
            CompressionFormat::Xz
        );
        assert_eq!(
            CompressionFormat::from_magic_bytes(&[0x28, 0xb5, 0x2f, 0xfd]),
            CompressionFormat::Zstd
        );
        assert_eq!(CompressionFormat::from_magic_bytes(b"<?xml"), CompressionFormat::None);
        assert_eq!(CompressionFormat::from_magic_bytes(&[0x1f]), CompressionFormat::None);
    }

    #[test]
    fn test_decompress_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"Package: bash\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let output = decompress_auto(&compressed).unwrap();
        assert_eq!(output, b"Package: bash\n");
    }

    #[test]
    fn test_decompress_zstd() {
        let compressed = zstd::encode_all(&b"<metadata/>"[..], 3).unwrap();
        let output = decompress_auto(&compressed).unwrap();
        assert_eq!(output, b"<metadata/>");
    }

    #[test]
    fn test_plain_passthrough() {
        let output = decompress_auto(b"<repomd/>").unwrap();
        assert_eq!(output, b"<repomd/>");
    }
}
