//! Per-message compression.

use std::fmt;
use std::io::{self, Read, Write};

use bytes::Bytes;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

/// One of the three algorithms this core understands. `grpc-encoding` /
/// `grpc-accept-encoding` carry these as lowercase tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionEncoding {
    Identity,
    Gzip,
    Deflate,
}

impl CompressionEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "identity" | "none" | "" => Some(Self::Identity),
            "gzip" => Some(Self::Gzip),
            "deflate" => Some(Self::Deflate),
            _ => None,
        }
    }

    /// Parses the comma-separated `grpc-accept-encoding` list.
    pub fn parse_accept_list(header: &str) -> Vec<Self> {
        header
            .split(',')
            .filter_map(|token| Self::parse(token.trim()))
            .collect()
    }

    pub fn compress(self, input: &[u8]) -> io::Result<Bytes> {
        match self {
            Self::Identity => Ok(Bytes::copy_from_slice(input)),
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(input)?;
                Ok(Bytes::from(encoder.finish()?))
            }
            Self::Deflate => {
                // zlib framing (windowBits=15).
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(input)?;
                Ok(Bytes::from(encoder.finish()?))
            }
        }
    }

    pub fn decompress(self, input: &[u8]) -> io::Result<Bytes> {
        match self {
            Self::Identity => Ok(Bytes::copy_from_slice(input)),
            Self::Gzip => {
                // windowBits=31 (gzip wrapper).
                let mut decoder = GzDecoder::new(input);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                Ok(Bytes::from(out))
            }
            Self::Deflate => {
                let mut decoder = ZlibDecoder::new(input);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                Ok(Bytes::from(out))
            }
        }
    }
}

impl fmt::Display for CompressionEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Downgrades `local` to [`CompressionEncoding::Identity`] if it isn't in
/// the peer's advertised accept-set.
pub fn negotiate(local: CompressionEncoding, peer_accepts: &[CompressionEncoding]) -> CompressionEncoding {
    if local == CompressionEncoding::Identity || peer_accepts.contains(&local) {
        local
    } else {
        CompressionEncoding::Identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = CompressionEncoding::Gzip.compress(&data).unwrap();
        let decompressed = CompressionEncoding::Gzip.decompress(&compressed).unwrap();
        assert_eq!(&decompressed[..], &data[..]);
    }

    #[test]
    fn deflate_round_trips() {
        let data = b"another message, different content".repeat(5);
        let compressed = CompressionEncoding::Deflate.compress(&data).unwrap();
        let decompressed = CompressionEncoding::Deflate.decompress(&compressed).unwrap();
        assert_eq!(&decompressed[..], &data[..]);
    }

    #[test]
    fn identity_is_passthrough() {
        let data = b"raw bytes";
        let compressed = CompressionEncoding::Identity.compress(data).unwrap();
        assert_eq!(&compressed[..], data);
    }

    #[test]
    fn parses_accept_encoding_list() {
        let parsed = CompressionEncoding::parse_accept_list("gzip, deflate, identity");
        assert_eq!(
            parsed,
            vec![
                CompressionEncoding::Gzip,
                CompressionEncoding::Deflate,
                CompressionEncoding::Identity,
            ]
        );
    }

    #[test]
    fn negotiate_downgrades_when_peer_does_not_accept() {
        let peer_accepts = vec![CompressionEncoding::Deflate];
        assert_eq!(
            negotiate(CompressionEncoding::Gzip, &peer_accepts),
            CompressionEncoding::Identity
        );
        assert_eq!(
            negotiate(CompressionEncoding::Deflate, &peer_accepts),
            CompressionEncoding::Deflate
        );
    }
}
