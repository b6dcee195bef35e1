//! Method descriptors.

use std::fmt;

/// The four RPC shapes a method can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Unary,
    ClientStreaming,
    ServerStreaming,
    Bidi,
}

impl MethodKind {
    pub fn client_streams(self) -> bool {
        matches!(self, Self::ClientStreaming | Self::Bidi)
    }

    pub fn server_streams(self) -> bool {
        matches!(self, Self::ServerStreaming | Self::Bidi)
    }
}

/// `(fully_qualified_service_name, method_name, kind)`. The wire path is
/// `/{service}/{method}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub service: String,
    pub method: String,
    pub kind: MethodKind,
}

impl MethodDescriptor {
    pub fn new(service: impl Into<String>, method: impl Into<String>, kind: MethodKind) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            kind,
        }
    }

    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }

    /// Parses a `/{service}/{method}` wire path.
    pub fn parse_path(path: &str) -> Option<(String, String)> {
        let trimmed = path.trim_start_matches('/');
        let mut parts = trimmed.splitn(2, '/');
        let service = parts.next()?.to_string();
        let method = parts.next()?.to_string();
        if service.is_empty() || method.is_empty() {
            None
        } else {
            Some((service, method))
        }
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
