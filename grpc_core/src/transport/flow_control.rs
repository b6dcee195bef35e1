//! Flow-control credit windows for HTTP/2 DATA writes.
//!
//! Streams request credit; only the transport manager mutates a window,
//! in response to bytes sent/received or a `WINDOW_UPDATE`-equivalent
//! replenishment from the peer. A connection-scoped window and a
//! stream-scoped window are tracked separately; a stream is throttled by
//! whichever is tighter.

use parking_lot::Mutex;

/// A single credit window: starts at `initial`, is debited as bytes are
/// sent and credited as `WINDOW_UPDATE`-equivalent replenishment arrives.
/// Never goes negative; a caller that would overdraw gets back the
/// available amount instead.
pub struct Window {
    available: Mutex<i64>,
}

impl Window {
    pub fn new(initial: u32) -> Self {
        Self {
            available: Mutex::new(initial as i64),
        }
    }

    pub fn available(&self) -> i64 {
        *self.available.lock()
    }

    /// Requests up to `wanted` bytes of credit, returning how much was
    /// actually granted (debited from the window). Returns 0 if the
    /// window is exhausted.
    pub fn request(&self, wanted: u32) -> u32 {
        let mut available = self.available.lock();
        let granted = (*available).max(0).min(wanted as i64);
        *available -= granted;
        granted as u32
    }

    /// Replenishes the window by `amount`, as the peer's
    /// `WINDOW_UPDATE`-equivalent credit grants would.
    pub fn replenish(&self, amount: u32) {
        let mut available = self.available.lock();
        *available += amount as i64;
    }
}

/// Connection-level and stream-level windows together. A stream is
/// throttled by whichever window is tighter.
pub struct FlowControl {
    connection: Window,
    initial_stream_window: u32,
}

impl FlowControl {
    pub fn new(initial_connection_window: u32, initial_stream_window: u32) -> Self {
        Self {
            connection: Window::new(initial_connection_window),
            initial_stream_window,
        }
    }

    pub fn connection_window(&self) -> &Window {
        &self.connection
    }

    pub fn new_stream_window(&self) -> Window {
        Window::new(self.initial_stream_window)
    }

    /// Requests credit from both the connection and a specific stream
    /// window, granting the lesser of the two. Anything granted from one
    /// window but not usable against the other is returned to that window
    /// immediately, since partial overdraft from only one side is not
    /// useful to a caller that must send a single contiguous chunk.
    pub fn request(&self, stream: &Window, wanted: u32) -> u32 {
        let from_conn = self.connection.request(wanted);
        let from_stream = stream.request(from_conn);
        if from_stream < from_conn {
            self.connection.replenish(from_conn - from_stream);
        }
        from_stream
    }
}
