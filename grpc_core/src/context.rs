//! The per-call context handed to a [`Handler`](crate::service::Handler).
//!
//! A plain struct in place of a class hierarchy: deadline, cancellation,
//! inbound metadata and an outbound-trailer staging area are all fields,
//! not virtual dispatch.

use std::time::Instant;

use tokio::sync::watch;

use crate::metadata::MetadataMap;
use crate::method::MethodDescriptor;
use crate::status::Status;

/// A cheap, cloneable handle that reports whether the call has been
/// cancelled, either by the peer (`RST_STREAM`) or locally (deadline).
#[derive(Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the call is cancelled. Safe to poll from a `select!`
    /// alongside the handler's own work.
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// The other half of a [`CancellationToken`], held by the call orchestrator.
pub struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    pub fn new() -> (Self, CancellationToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancellationToken { rx })
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Per-call state visible to application handlers. Constructed by the call
/// orchestrator and threaded through to [`Handler`](crate::service::Handler)
/// invocations; never constructed by application code directly.
pub struct CallContext {
    method: MethodDescriptor,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    inbound_metadata: MetadataMap,
    outbound_trailers: MetadataMap,
    outbound_initial_metadata: MetadataMap,
}

impl CallContext {
    pub fn new(
        method: MethodDescriptor,
        deadline: Option<Instant>,
        cancellation: CancellationToken,
        inbound_metadata: MetadataMap,
    ) -> Self {
        Self {
            method,
            deadline,
            cancellation,
            inbound_metadata,
            outbound_trailers: MetadataMap::new(),
            outbound_initial_metadata: MetadataMap::new(),
        }
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn inbound_metadata(&self) -> &MetadataMap {
        &self.inbound_metadata
    }

    /// Staging area for metadata sent before the first response message
    /// (server-streaming/bidi handlers may want to set this explicitly;
    /// unary/client-streaming handlers get a default empty map flushed by
    /// the orchestrator).
    pub fn outbound_initial_metadata_mut(&mut self) -> &mut MetadataMap {
        &mut self.outbound_initial_metadata
    }

    pub fn outbound_initial_metadata(&self) -> &MetadataMap {
        &self.outbound_initial_metadata
    }

    /// Staging area for trailer metadata; flushed by the orchestrator
    /// alongside the terminal [`Status`] once the handler returns.
    pub fn outbound_trailers_mut(&mut self) -> &mut MetadataMap {
        &mut self.outbound_trailers
    }

    pub fn outbound_trailers(&self) -> &MetadataMap {
        &self.outbound_trailers
    }

    /// Checks the deadline and cancellation token together, returning the
    /// terminal status a handler should bail out with, if any.
    pub fn check_alive(&self) -> Result<(), Status> {
        if self.is_cancelled() {
            return Err(Status::cancelled("call cancelled"));
        }
        if self.is_expired() {
            return Err(Status::new(
                crate::status::Code::DeadlineExceeded,
                "deadline exceeded",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodKind;

    fn make_context() -> (CancellationSource, CallContext) {
        let (source, token) = CancellationSource::new();
        let ctx = CallContext::new(
            MethodDescriptor::new("pkg.Svc", "Method", MethodKind::Unary),
            None,
            token,
            MetadataMap::new(),
        );
        (source, ctx)
    }

    #[test]
    fn fresh_context_is_alive() {
        let (_source, ctx) = make_context();
        assert!(ctx.check_alive().is_ok());
    }

    #[test]
    fn cancellation_is_observed_through_the_token() {
        let (source, ctx) = make_context();
        assert!(!ctx.is_cancelled());
        source.cancel();
        assert!(ctx.is_cancelled());
        assert!(ctx.check_alive().is_err());
    }

    #[test]
    fn expired_deadline_fails_check_alive() {
        let (_source, token) = CancellationSource::new();
        let ctx = CallContext::new(
            MethodDescriptor::new("pkg.Svc", "Method", MethodKind::Unary),
            Some(Instant::now() - std::time::Duration::from_secs(1)),
            token,
            MetadataMap::new(),
        );
        let err = ctx.check_alive().unwrap_err();
        assert_eq!(err.code(), crate::status::Code::DeadlineExceeded);
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let (source, ctx) = make_context();
        let mut token = ctx.cancellation();
        source.cancel();
        token.cancelled().await;
        assert!(token.is_cancelled());
    }
}
