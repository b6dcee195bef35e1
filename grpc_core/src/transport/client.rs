//! Client-side transport manager: owns the stream table for one HTTP/2
//! connection, allocates client-initiated (odd) stream ids, and drives
//! graceful shutdown by draining in-flight calls before closing.
//!
//! Generalizes `h2per::transport::Http2Transport`'s
//! `next_stream_id`/`streams` pair (see DESIGN.md) from a single
//! connection-agnostic counter into a manager that also tracks
//! connectivity and flow control.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

use crate::error::Error;
use crate::stream_state::{Side, StreamStateMachine};
use crate::transport::backoff::{Backoff, BackoffConfig};
use crate::transport::connectivity::{ConnectivityState, ConnectivityTracker};
use crate::transport::flow_control::{FlowControl, Window};
use crate::transport::TransportConfig;

struct StreamEntry {
    state: StreamStateMachine,
    window: Window,
}

/// Client-side connection configuration: transport-level settings plus
/// the reconnect backoff policy and the idle timeout before a connection
/// with no active streams closes itself.
#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportConfig,
    pub backoff: BackoffConfig,
    pub max_idle: std::time::Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            backoff: BackoffConfig::default(),
            max_idle: std::time::Duration::from_secs(300),
        }
    }
}

/// Owns one client connection's worth of stream bookkeeping. Does not
/// itself own the socket or the `h2` handle; the caller drives frame I/O
/// through `FrameSink`/`FrameSource` and reports stream lifecycle events
/// here so the manager can enforce allocation, flow control, and drain
/// ordering.
pub struct ClientTransportManager {
    next_stream_id: AtomicU32,
    streams: Mutex<HashMap<u32, StreamEntry>>,
    flow_control: FlowControl,
    connectivity: ConnectivityTracker,
    connectivity_rx: watch::Receiver<ConnectivityState>,
    backoff: Mutex<Backoff>,
    draining: Mutex<bool>,
    max_idle: std::time::Duration,
    idle_since: Mutex<Option<Instant>>,
    idle_notify: Notify,
}

impl ClientTransportManager {
    pub fn new(config: TransportConfig, backoff_config: BackoffConfig) -> Self {
        Self::with_max_idle(config, backoff_config, Config::default().max_idle)
    }

    pub fn with_max_idle(config: TransportConfig, backoff_config: BackoffConfig, max_idle: std::time::Duration) -> Self {
        let (connectivity, connectivity_rx) = ConnectivityTracker::new();
        Self {
            next_stream_id: AtomicU32::new(1), // client streams are odd-numbered
            streams: Mutex::new(HashMap::new()),
            flow_control: FlowControl::new(config.initial_connection_window, config.initial_stream_window),
            connectivity,
            connectivity_rx,
            backoff: Mutex::new(Backoff::new(backoff_config)),
            draining: Mutex::new(false),
            max_idle,
            idle_since: Mutex::new(Some(Instant::now())),
            idle_notify: Notify::new(),
        }
    }

    pub fn from_config(config: Config) -> Self {
        Self::with_max_idle(config.transport, config.backoff, config.max_idle)
    }

    pub fn connectivity_state(&self) -> ConnectivityState {
        self.connectivity.current()
    }

    pub fn connectivity_receiver(&self) -> watch::Receiver<ConnectivityState> {
        self.connectivity_rx.clone()
    }

    pub fn transition(&self, next: ConnectivityState) -> bool {
        let transitioned = self.connectivity.transition(next);
        if transitioned {
            tracing::debug!(?next, "client connectivity transition");
            if next == ConnectivityState::Ready {
                self.backoff.lock().reset();
            }
        }
        transitioned
    }

    /// Delay to wait before the next reconnect attempt.
    pub fn next_reconnect_delay(&self) -> std::time::Duration {
        self.backoff.lock().next_delay()
    }

    /// Allocates a new client-initiated stream id and registers its state
    /// machine. Returns `unavailable` if the manager is draining or has
    /// reached `max_concurrent_streams`.
    pub fn open_stream(&self, max_concurrent_streams: u32) -> Result<u32, Error> {
        if *self.draining.lock() {
            return Err(Error::Transport("connection is draining, cannot open new streams".to_string()));
        }
        let mut streams = self.streams.lock();
        if streams.len() as u32 >= max_concurrent_streams {
            return Err(Error::Transport("max_concurrent_streams reached".to_string()));
        }
        let id = self.next_stream_id.fetch_add(2, Ordering::SeqCst);
        streams.insert(
            id,
            StreamEntry {
                state: StreamStateMachine::new(Side::Client),
                window: self.flow_control.new_stream_window(),
            },
        );
        *self.idle_since.lock() = None;
        self.idle_notify.notify_waiters();
        tracing::debug!(stream_id = id, "opened client stream");
        Ok(id)
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().len()
    }

    pub fn apply_event(&self, id: u32, event: crate::stream_state::Event) -> Result<(), Error> {
        let mut streams = self.streams.lock();
        let entry = streams
            .get_mut(&id)
            .ok_or_else(|| Error::Protocol(format!("unknown stream id {id}")))?;
        entry.state.apply(event)?;
        if entry.state.is_terminal() {
            streams.remove(&id);
        }
        if streams.is_empty() {
            *self.idle_since.lock() = Some(Instant::now());
            self.idle_notify.notify_waiters();
        }
        Ok(())
    }

    /// Sleeps until no stream has been open for `max_idle`, measured from
    /// the moment the stream table last became empty, then transitions
    /// the connection to `idle`. Waits out any interval
    /// during which a stream is open, and restarts the countdown whenever
    /// a stream opens and closes again before the timer fires.
    pub async fn wait_for_max_idle(&self) {
        loop {
            let since = match *self.idle_since.lock() {
                Some(since) => since,
                None => {
                    self.idle_notify.notified().await;
                    continue;
                }
            };
            let elapsed = since.elapsed();
            if elapsed >= self.max_idle {
                if self.transition(ConnectivityState::Idle) {
                    tracing::debug!("connection idle for {:?}, closing", self.max_idle);
                }
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.max_idle - elapsed) => {}
                _ = self.idle_notify.notified() => {}
            }
        }
    }

    pub fn request_stream_credit(&self, id: u32, wanted: u32) -> Result<u32, Error> {
        let streams = self.streams.lock();
        let entry = streams
            .get(&id)
            .ok_or_else(|| Error::Protocol(format!("unknown stream id {id}")))?;
        Ok(self.flow_control.request(&entry.window, wanted))
    }

    /// Marks the connection as draining: no further `open_stream` calls
    /// succeed, but streams already open continue to completion. Returns
    /// once the stream table is empty.
    pub async fn graceful_shutdown(&self) {
        tracing::debug!("beginning graceful client shutdown");
        *self.draining.lock() = true;
        loop {
            if self.streams.lock().is_empty() {
                self.transition(ConnectivityState::Shutdown);
                return;
            }
            self.idle_notify.notified().await;
        }
    }

    pub fn is_draining(&self) -> bool {
        *self.draining.lock()
    }
}
