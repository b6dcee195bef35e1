//! Server-side transport manager: accepts server-initiated bookkeeping
//! for a single HTTP/2 connection, tracking the highest client stream id
//! processed so a graceful shutdown can emit a correct `GOAWAY`-equivalent
//! signal.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::Error;
use crate::stream_state::{Side, StreamStateMachine};
use crate::transport::flow_control::{FlowControl, Window};
use crate::transport::TransportConfig;

struct StreamEntry {
    state: StreamStateMachine,
    window: Window,
}

/// Server-side connection configuration: transport-level settings plus
/// keepalive, mirroring `transport::client::Config` for the accept side.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transport: TransportConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
        }
    }
}

/// The outcome of a graceful shutdown: the highest stream id that had
/// already been accepted and will be allowed to finish, mirroring the
/// semantics HTTP/2 `GOAWAY` assigns to its last-stream-id field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoAway {
    pub last_stream_id: u32,
}

pub struct ServerTransportManager {
    streams: Mutex<HashMap<u32, StreamEntry>>,
    flow_control: FlowControl,
    highest_stream_id: Mutex<u32>,
    draining: Mutex<bool>,
    max_concurrent_streams: u32,
    drained_notify: Notify,
}

impl ServerTransportManager {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            flow_control: FlowControl::new(config.initial_connection_window, config.initial_stream_window),
            highest_stream_id: Mutex::new(0),
            draining: Mutex::new(false),
            max_concurrent_streams: config.max_concurrent_streams,
            drained_notify: Notify::new(),
        }
    }

    /// Accepts a peer-initiated stream id (even-numbered, per HTTP/2's
    /// client/server id split). Rejects new streams once draining or at
    /// the concurrency limit.
    pub fn accept_stream(&self, id: u32) -> Result<(), Error> {
        if *self.draining.lock() {
            return Err(Error::Transport("connection is draining, rejecting new stream".to_string()));
        }
        let mut streams = self.streams.lock();
        if streams.len() as u32 >= self.max_concurrent_streams {
            return Err(Error::Transport("max_concurrent_streams reached".to_string()));
        }
        streams.insert(
            id,
            StreamEntry {
                state: StreamStateMachine::new(Side::Server),
                window: self.flow_control.new_stream_window(),
            },
        );
        let mut highest = self.highest_stream_id.lock();
        if id > *highest {
            *highest = id;
        }
        tracing::debug!(stream_id = id, "accepted server stream");
        Ok(())
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
            self.drained_notify.notify_waiters();
        }
        Ok(())
    }

    pub fn request_stream_credit(&self, id: u32, wanted: u32) -> Result<u32, Error> {
        let streams = self.streams.lock();
        let entry = streams
            .get(&id)
            .ok_or_else(|| Error::Protocol(format!("unknown stream id {id}")))?;
        Ok(self.flow_control.request(&entry.window, wanted))
    }

    /// Begins a graceful shutdown: stops accepting new streams and
    /// returns the `GOAWAY`-equivalent signal the caller should send with
    /// the highest stream id accepted so far. In-flight streams are left
    /// to finish; call [`ServerTransportManager::wait_drained`] afterward.
    pub fn begin_graceful_shutdown(&self) -> GoAway {
        *self.draining.lock() = true;
        let goaway = GoAway {
            last_stream_id: *self.highest_stream_id.lock(),
        };
        tracing::warn!(last_stream_id = goaway.last_stream_id, "sending GOAWAY, draining connection");
        goaway
    }

    pub async fn wait_drained(&self) {
        loop {
            if self.streams.lock().is_empty() {
                return;
            }
            self.drained_notify.notified().await;
        }
    }

    pub fn is_draining(&self) -> bool {
        *self.draining.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_state::Event;

    #[test]
    fn accept_stream_tracks_the_highest_id_seen() {
        let manager = ServerTransportManager::new(TransportConfig::default());
        manager.accept_stream(2).unwrap();
        manager.accept_stream(8).unwrap();
        manager.accept_stream(4).unwrap();
        assert_eq!(manager.begin_graceful_shutdown().last_stream_id, 8);
    }

    #[test]
    fn draining_rejects_new_streams() {
        let manager = ServerTransportManager::new(TransportConfig::default());
        manager.accept_stream(2).unwrap();
        manager.begin_graceful_shutdown();
        assert!(manager.accept_stream(4).is_err());
    }

    #[test]
    fn concurrency_limit_is_enforced() {
        let mut config = TransportConfig::default();
        config.max_concurrent_streams = 1;
        let manager = ServerTransportManager::new(config);
        manager.accept_stream(2).unwrap();
        assert!(manager.accept_stream(4).is_err());
    }

    #[tokio::test]
    async fn wait_drained_resolves_once_streams_finish() {
        let manager = ServerTransportManager::new(TransportConfig::default());
        manager.accept_stream(2).unwrap();
        let manager = std::sync::Arc::new(manager);
        let waiting = manager.clone();
        let handle = tokio::spawn(async move { waiting.wait_drained().await });
        tokio::task::yield_now().await;
        manager.apply_event(2, Event::Reset).unwrap();
        handle.await.unwrap();
    }
}
