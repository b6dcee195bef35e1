//! Per-call configuration.

use std::time::{Duration, Instant};

use crate::compression::CompressionEncoding;
use crate::metadata::MetadataMap;

#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Absolute instant at which the call fails with `deadlineExceeded`.
    pub deadline: Option<Instant>,
    /// Per-call outbound compression override.
    pub compression: Option<CompressionEncoding>,
    /// Inbound algorithms advertised to the peer via `grpc-accept-encoding`.
    pub accepted_compression: Vec<CompressionEncoding>,
    /// Upper bound on a single decoded outbound message.
    pub max_request_size: Option<usize>,
    /// Upper bound on a single decoded inbound message.
    pub max_response_size: Option<usize>,
    /// If set, the client does not fail immediately when the transport is
    /// `transientFailure`; it waits for readiness instead.
    pub wait_for_ready: bool,
    /// Custom metadata to prepend to the call's initial metadata.
    pub initial_metadata: MetadataMap,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a relative `timeout` into an absolute `deadline`, anchored
    /// at call start.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_compression(mut self, compression: CompressionEncoding) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_wait_for_ready(mut self, wait: bool) -> Self {
        self.wait_for_ready = wait;
        self
    }

    /// Time remaining until the deadline, or `None` if there is none.
    /// Saturates at zero rather than going negative once the deadline has
    /// passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
