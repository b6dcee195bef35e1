//! Core runtime for gRPC-over-HTTP/2.
//!
//! This crate implements the parts of the gRPC wire protocol and call
//! lifecycle that sit below a generated stub and above raw HTTP/2 frames:
//!
//! - [`framer`]/[`deframer`]: the length-prefixed, optionally compressed
//!   message framing format.
//! - [`stream_state`]: the per-RPC state machine.
//! - [`call`]/[`context`]/[`service`]: the call orchestrator, its
//!   per-call context, and handler registration.
//! - [`transport`]: connection-level multiplexing, flow control,
//!   keepalive, graceful shutdown, and client reconnect.
//!
//! IDL code generation, HPACK/TLS/ALPN, and a generated stub surface are
//! out of scope; this crate consumes and produces HTTP/2 frame payloads
//! through the [`transport::FrameSink`]/[`transport::FrameSource`] traits.

pub mod call;
pub mod call_options;
pub mod codec;
pub mod compression;
pub mod context;
pub mod deframer;
pub mod error;
pub mod framer;
pub mod grpc_timeout;
pub mod metadata;
pub mod method;
pub mod service;
pub mod status;
pub mod stream_state;
pub mod transport;

pub mod prelude {
    //! Common imports for building a service on top of this crate.
    pub use crate::call::{dispatch, CallCompleter, CallHandle, Interceptor, InterceptorChain, RetryPolicy};
    pub use crate::call_options::CallOptions;
    pub use crate::codec::{Codec, Decoder, Encoder, ProstCodec};
    pub use crate::compression::CompressionEncoding;
    pub use crate::context::CallContext;
    pub use crate::error::{Error, Result};
    pub use crate::method::{MethodDescriptor, MethodKind};
    pub use crate::service::{Handler, Service, ServiceRegistry};
    pub use crate::status::{Code, Status};
}
