//! The call orchestrator: drives a single RPC from accepted initial
//! metadata through to a terminal [`Status`], regardless of method arity.
//!
//! Completing exactly one pending operation per state edge is modeled with
//! a one-shot notification primitive rather than a mutable promise chain:
//! `tokio::sync::oneshot` plays that role here, and the deadline timer
//! races the handler's own completion on it via `select!` at the call
//! sites in `transport::client`/`transport::server`.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time;

use crate::context::{CallContext, CancellationSource};
use crate::metadata::MetadataMap;
use crate::method::MethodDescriptor;
use crate::status::{Code, Status};

/// A hook applications can install to inspect or reject a call before the
/// handler runs, and to observe its terminal status afterward. Mirrors the
/// client/server interceptor concept without inventing a plugin framework.
pub trait Interceptor: Send + Sync {
    /// Called with the inbound metadata before dispatch. Returning `Err`
    /// fails the call immediately without invoking the handler.
    fn on_call_start(&self, _method: &MethodDescriptor, _metadata: &MetadataMap) -> Result<(), Status> {
        Ok(())
    }

    /// Called once the call has produced its terminal status.
    fn on_call_end(&self, _method: &MethodDescriptor, _status: &Status) {}
}

/// An ordered list of [`Interceptor`]s, run in registration order on the
/// way in and in the same order on the way out. Shared across calls via
/// `Arc`, never mutated once a server or client is built.
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<std::sync::Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interceptor: std::sync::Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Runs every interceptor's `on_call_start`, stopping at (and
    /// returning) the first rejection.
    pub fn run_start(&self, method: &MethodDescriptor, metadata: &MetadataMap) -> Result<(), Status> {
        for interceptor in &self.interceptors {
            interceptor.on_call_start(method, metadata)?;
        }
        Ok(())
    }

    /// Runs every interceptor's `on_call_end`. Never fails: an
    /// interceptor observing the terminal status cannot change it.
    pub fn run_end(&self, method: &MethodDescriptor, status: &Status) {
        for interceptor in &self.interceptors {
            interceptor.on_call_end(method, status);
        }
    }
}

/// A caller-supplied policy deciding whether a failed call may be retried.
/// The core does not parse service config or count attempts; it only asks
/// this hook, per the Open Question resolution in DESIGN.md.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, status: &Status, attempt: u32) -> bool;
}

/// A `RetryPolicy` that never retries, used when no policy is configured.
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn should_retry(&self, _status: &Status, _attempt: u32) -> bool {
        false
    }
}

/// Races a handler future against the call's deadline, returning whichever
/// completes first. The handler future is dropped (not polled again) once
/// the deadline wins, releasing its resources cooperatively at the next
/// await point.
pub async fn run_with_deadline<F, T>(ctx: &CallContext, handler: F) -> Result<T, Status>
where
    F: std::future::Future<Output = Result<T, Status>>,
{
    let mut cancellation = ctx.cancellation();
    match ctx.deadline() {
        None => {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => Err(Status::cancelled("call cancelled")),
                result = handler => result,
            }
        }
        Some(deadline) => {
            let sleep = time::sleep_until(deadline.into());
            tokio::pin!(sleep);
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => Err(Status::cancelled("call cancelled")),
                _ = &mut sleep => Err(Status::new(Code::DeadlineExceeded, "deadline exceeded")),
                result = handler => result,
            }
        }
    }
}

/// Runs one server-side call end to end: the interceptor chain's start
/// hooks, then the handler under the call's deadline/cancellation, then
/// the interceptor chain's end hooks with whatever [`Status`] resulted.
/// `handler` produces the response value on success; its `Status` on
/// failure becomes the call's terminal status either way.
pub async fn dispatch<F, T>(
    chain: &InterceptorChain,
    ctx: &CallContext,
    handler: F,
) -> (Result<T, Status>, Status)
where
    F: std::future::Future<Output = Result<T, Status>>,
{
    if let Err(status) = chain.run_start(ctx.method(), ctx.inbound_metadata()) {
        chain.run_end(ctx.method(), &status);
        return (Err(status.clone()), status);
    }

    let result = run_with_deadline(ctx, handler).await;
    let status = match &result {
        Ok(_) => Status::ok(),
        Err(status) => status.clone(),
    };
    chain.run_end(ctx.method(), &status);
    (result, status)
}

/// The orchestrator-side handle for a single in-flight call: owns the
/// cancellation source and the one-shot channel the transport layer uses
/// to deliver this call's terminal status back to whoever is awaiting it
/// (a client call future, or the server's response-writing task).
pub struct CallHandle {
    cancellation: CancellationSource,
    completion: Option<oneshot::Receiver<Status>>,
}

impl CallHandle {
    pub fn new() -> (Self, CallCompleter) {
        let (cancellation, token) = CancellationSource::new();
        let (tx, rx) = oneshot::channel();
        (
            Self {
                cancellation,
                completion: Some(rx),
            },
            CallCompleter { tx, token },
        )
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Awaits the call's terminal status. Returns `internalError` if the
    /// completer was dropped without ever sending one (a bug at the call
    /// site, not a status the peer produced).
    pub async fn wait(&mut self) -> Status {
        match self.completion.take() {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Status::new(Code::Internal, "call completer dropped without a status")
            }),
            None => Status::new(Code::Internal, "call status already consumed"),
        }
    }
}

/// The transport-side counterpart to [`CallHandle`]: delivers exactly one
/// terminal status, and exposes the cancellation token the [`CallContext`]
/// is built from.
pub struct CallCompleter {
    tx: oneshot::Sender<Status>,
    token: crate::context::CancellationToken,
}

impl CallCompleter {
    pub fn cancellation_token(&self) -> crate::context::CancellationToken {
        self.token.clone()
    }

    /// Delivers the terminal status. Consumes `self` so a completer can
    /// only ever be used once, enforcing "status delivered exactly once"
    /// at the type level.
    pub fn complete(self, status: Status) {
        let _ = self.tx.send(status);
    }
}

/// Runs `attempt` repeatedly under `policy` until it returns `Ok`, a
/// non-retryable `Err`, or the policy declines a further attempt.
pub async fn with_retry<F, Fut, T>(policy: &dyn RetryPolicy, mut attempt: F) -> Result<T, Status>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, Status>>,
{
    let mut attempt_number = 0;
    loop {
        attempt_number += 1;
        match attempt(attempt_number).await {
            Ok(value) => return Ok(value),
            Err(status) if policy.should_retry(&status, attempt_number) => continue,
            Err(status) => return Err(status),
        }
    }
}

/// Converts a relative timeout into the deadline form `CallContext`
/// expects, mirroring `CallOptions::with_timeout`'s conversion rule.
pub fn deadline_from_timeout(timeout: Duration) -> std::time::Instant {
    std::time::Instant::now() + timeout
}
