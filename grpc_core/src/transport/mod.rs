//! Transport-level connection management: multiplexing multiple RPCs over
//! one HTTP/2 connection, flow control, keepalive, graceful shutdown, and
//! client-side reconnect.
//!
//! HPACK, TLS/ALPN, and raw HTTP/2 frame parsing are out of scope; this
//! module consumes and produces frame *payloads* through
//! [`FrameSink`]/[`FrameSource`], which the `h2` crate satisfies directly
//! for its `SendStream`/`RecvStream` handles.

pub mod backoff;
pub mod client;
pub mod connectivity;
pub mod flow_control;
pub mod keepalive;
pub mod server;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Error;

/// The write half of a transport-level stream. An `h2::SendStream<Bytes>`
/// satisfies this directly; tests use an in-memory channel-backed
/// implementation instead.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_data(&mut self, data: Bytes, end_of_stream: bool) -> Result<(), Error>;
    async fn send_trailers(&mut self, trailers: http::HeaderMap) -> Result<(), Error>;
    fn reset(&mut self, error_code: u32);
}

/// The read half of a transport-level stream, yielding frame payloads in
/// order until end-of-stream.
#[async_trait]
pub trait FrameSource: Send {
    /// Returns `Ok(None)` at a clean end-of-stream.
    async fn recv_data(&mut self) -> Result<Option<Bytes>, Error>;
    async fn recv_trailers(&mut self) -> Result<Option<http::HeaderMap>, Error>;
}

/// Shared connection-level configuration, independent of client/server
/// role.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub initial_connection_window: u32,
    pub initial_stream_window: u32,
    pub keepalive: keepalive::KeepaliveConfig,
    pub max_concurrent_streams: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            initial_connection_window: 65_535,
            initial_stream_window: 65_535,
            keepalive: keepalive::KeepaliveConfig::default(),
            max_concurrent_streams: 100,
        }
    }
}
