//! Ordered key/value metadata.
//!
//! Keys are ASCII, compared case-insensitively but preserved on emission.
//! Keys suffixed `-bin` carry opaque binary values; all others must carry
//! valid ASCII text. Duplicates are allowed and order is preserved.

use std::fmt;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue};

/// Pseudo-headers and gRPC control keys the core injects and strips; never
/// user-settable.
const RESERVED_KEYS: &[&str] = &[
    ":method",
    ":scheme",
    ":path",
    ":authority",
    ":status",
    "grpc-status",
    "grpc-message",
    "grpc-encoding",
    "grpc-accept-encoding",
    "grpc-timeout",
    "content-type",
    "te",
    "user-agent",
];

/// Whether `key` is reserved for the core's own use and therefore rejected
/// from user-supplied metadata.
pub fn is_reserved_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    RESERVED_KEYS.iter().any(|&reserved| reserved == lower)
}

/// A single metadata value: either a UTF-8 string (ordinary key) or opaque
/// bytes (`-bin` suffixed key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    Ascii(String),
    Binary(Bytes),
}

impl MetadataValue {
    pub fn as_ascii(&self) -> Option<&str> {
        match self {
            Self::Ascii(s) => Some(s),
            Self::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            Self::Ascii(_) => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascii(s) => f.write_str(s),
            Self::Binary(b) => write!(f, "<{} bytes binary>", b.len()),
        }
    }
}

/// An ordered list of `(key, value)` pairs, preserving insertion order and
/// duplicate entries end-to-end.
#[derive(Debug, Clone, Default)]
pub struct MetadataMap {
    entries: Vec<(String, MetadataValue)>,
}

/// Error returned when a metadata entry violates the rules above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    Reserved(String),
    NonAsciiValue(String),
    BinaryKeyMismatch(String),
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved(key) => write!(f, "metadata key '{key}' is reserved"),
            Self::NonAsciiValue(key) => write!(f, "metadata key '{key}' requires an ASCII value"),
            Self::BinaryKeyMismatch(key) => {
                write!(f, "metadata key '{key}' must end in -bin to carry binary data")
            }
        }
    }
}

impl std::error::Error for MetadataError {}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_bin_key(key: &str) -> bool {
        key.to_ascii_lowercase().ends_with("-bin")
    }

    /// Inserts a UTF-8 value. Rejects reserved keys and `-bin` keys (which
    /// must use [`MetadataMap::insert_bin`]).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), MetadataError> {
        let key = key.into();
        if is_reserved_key(&key) {
            return Err(MetadataError::Reserved(key));
        }
        if Self::is_bin_key(&key) {
            return Err(MetadataError::BinaryKeyMismatch(key));
        }
        let value = value.into();
        if !value.is_ascii() {
            return Err(MetadataError::NonAsciiValue(key));
        }
        self.entries.push((key, MetadataValue::Ascii(value)));
        Ok(())
    }

    /// Inserts a binary value under a `-bin` suffixed key.
    pub fn insert_bin(&mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Result<(), MetadataError> {
        let key = key.into();
        if is_reserved_key(&key) {
            return Err(MetadataError::Reserved(key));
        }
        if !Self::is_bin_key(&key) {
            return Err(MetadataError::BinaryKeyMismatch(key));
        }
        self.entries.push((key, MetadataValue::Binary(value.into())));
        Ok(())
    }

    /// Returns the first value for `key`, case-insensitively.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Returns every value for `key` in emission order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a MetadataValue> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extracts user metadata from an HTTP header map, stripping
    /// pseudo-headers and gRPC/HTTP control keys.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut map = Self::new();
        for (name, value) in headers {
            let name_str = name.as_str();
            if name_str.starts_with(':') || is_reserved_key(name_str) {
                continue;
            }
            if Self::is_bin_key(name_str) {
                let _ = map.insert_bin(name_str.to_string(), Bytes::copy_from_slice(value.as_bytes()));
            } else if let Ok(text) = value.to_str() {
                let _ = map.insert(name_str.to_string(), text.to_string());
            }
        }
        map
    }

    /// Serializes this metadata back onto an HTTP header map, preserving
    /// order and duplicate entries.
    pub fn to_headers(&self, headers: &mut HeaderMap) {
        for (key, value) in &self.entries {
            let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
                continue;
            };
            let header_value = match value {
                MetadataValue::Ascii(s) => HeaderValue::from_str(s).ok(),
                MetadataValue::Binary(b) => HeaderValue::from_bytes(b).ok(),
            };
            if let Some(header_value) = header_value {
                headers.append(name, header_value);
            }
        }
    }
}
