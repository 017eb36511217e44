//! Reconnect backoff
//!
//! Bounded exponential backoff shared by the FIFO transport and the bus
//! notifier. Retries never give up; only the delay between attempts is capped.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay bounds for reopening a transport or bus connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for the delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with explicit bounds
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial_delay_ms: initial.as_millis() as u64,
            max_delay_ms: max.as_millis() as u64,
        }
    }

    /// Start a fresh backoff sequence
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            attempt: 0,
        }
    }
}

/// Running backoff state for one connection
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl Backoff {
    /// Delay to wait before the next attempt; doubles until the cap
    pub fn next_delay(&mut self) -> Duration {
        let initial = self.policy.initial_delay_ms.max(1);
        let max = self.policy.max_delay_ms.max(initial);
        let factor = 1u64.checked_shl(self.attempt.min(32)).unwrap_or(u64::MAX);
        let delay = initial.saturating_mul(factor).min(max);
        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(delay)
    }

    /// Number of delays handed out since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Reset after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
