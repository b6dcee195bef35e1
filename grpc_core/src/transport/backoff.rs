//! Reconnect backoff: `min(max, initial * multiplier^n) ± jitter`,
//! resetting on a successful connection.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
    /// Fraction of the computed delay to randomize by, e.g. `0.2` jitters
    /// ±20%.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1000),
            max: Duration::from_secs(120),
            multiplier: 1.6,
            jitter: 0.2,
        }
    }
}

/// Tracks the reconnect attempt count and computes the next delay. Reset
/// to attempt zero whenever the connection reaches `ready`.
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Computes the delay before the next reconnect attempt and advances
    /// the attempt counter, so repeated calls escalate.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.config.initial.as_secs_f64() * self.config.multiplier.powi(self.attempt as i32);
        let capped = base.min(self.config.max.as_secs_f64());
        self.attempt = self.attempt.saturating_add(1);
        let delay = Duration::from_secs_f64(apply_jitter(capped, self.config.jitter));
        tracing::trace!(attempt = self.attempt, ?delay, "computed reconnect backoff");
        delay
    }

    /// Called once the connection reaches `ready`.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

fn apply_jitter(base: f64, jitter: f64) -> f64 {
    if jitter <= 0.0 {
        return base;
    }
    let spread = base * jitter;
    let offset = rand::thread_rng().gen_range(-spread..=spread);
    (base + offset).max(0.0)
}
