//! Idle-triggered HTTP/2 PING keepalive: after `time` of connection
//! idleness send a PING; if no ACK arrives within `timeout`, treat the
//! connection as dead.

use std::time::Duration;

use tokio::time::{self, Instant};

#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    /// How long the connection may sit idle before a PING is sent.
    pub time: Duration,
    /// How long to wait for the PING ACK before declaring the connection
    /// unavailable.
    pub timeout: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            time: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of waiting out a keepalive cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveOutcome {
    /// Traffic was observed before the idle timer fired; no PING needed.
    TrafficObserved,
    /// The idle timer fired, a PING should be sent now.
    ShouldPing,
}

/// Tracks the last-activity instant and decides when a PING is due. The
/// transport manager calls [`Keepalive::wait_for_idle`] in its event loop
/// and resets activity via [`Keepalive::note_activity`] on any frame.
pub struct Keepalive {
    config: KeepaliveConfig,
    last_activity: Instant,
}

impl Keepalive {
    pub fn new(config: KeepaliveConfig) -> Self {
        Self {
            config,
            last_activity: Instant::now(),
        }
    }

    pub fn note_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Sleeps until the connection has been idle for `config.time`,
    /// measured from the most recent activity (so activity observed while
    /// waiting pushes the deadline out, rather than firing a stale timer).
    pub async fn wait_for_idle(&self) {
        loop {
            let elapsed = self.last_activity.elapsed();
            if elapsed >= self.config.time {
                tracing::debug!("connection idle, sending keepalive PING");
                return;
            }
            time::sleep(self.config.time - elapsed).await;
            if self.last_activity.elapsed() >= self.config.time {
                return;
            }
        }
    }

    /// Races a PING-ACK future against `config.timeout`. `Ok(())` means
    /// the ACK arrived in time; `Err(())` means the deadline fired and the
    /// caller should close the connection with `unavailable`.
    pub async fn wait_for_ack<F>(&self, ack: F) -> Result<(), ()>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = ack => Ok(()),
            _ = time::sleep(self.config.timeout) => {
                tracing::warn!(timeout = ?self.config.timeout, "keepalive PING ACK timed out, connection unavailable");
                Err(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn wait_for_idle_returns_after_the_configured_duration() {
        let keepalive = Keepalive::new(KeepaliveConfig {
            time: Duration::from_millis(50),
            timeout: Duration::from_secs(1),
        });
        let start = Instant::now();
        keepalive.wait_for_idle().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn ack_arriving_in_time_succeeds() {
        let keepalive = Keepalive::new(KeepaliveConfig {
            time: Duration::from_secs(30),
            timeout: Duration::from_millis(50),
        });
        let result = keepalive.wait_for_ack(async {}).await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ack_times_out() {
        let keepalive = Keepalive::new(KeepaliveConfig {
            time: Duration::from_secs(30),
            timeout: Duration::from_millis(50),
        });
        let result = keepalive.wait_for_ack(std::future::pending::<()>()).await;
        assert!(result.is_err());
    }
}
