//! Exponential backoff between connection attempts.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt, and the value the
    /// delay resets to after a successful connect.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Delay schedule between connection attempts.
///
/// Each [`next_delay`](Backoff::next_delay) returns the current wait and
/// grows the following one by `multiplier`, up to `max_delay`.
/// [`reset`](Backoff::reset) drops back to `initial_delay`; call it after
/// every successful connect.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        let current = config.initial_delay.min(config.max_delay);
        Self { config, current }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = delay
            .mul_f64(self.config.multiplier.max(1.0))
            .min(self.config.max_delay);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.config.initial_delay.min(self.config.max_delay);
    }
}
