//! Session controller configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults; invalid numeric values fall back to the default rather than
//! failing startup.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Default class clock tick interval in seconds.
pub const DEFAULT_TICK_INTERVAL_SECONDS: u64 = 1;

/// Default session mailbox buffer size.
pub const DEFAULT_MAILBOX_BUFFER: usize = 500;

/// Default timeout for each remote step of `join()`, in seconds.
pub const DEFAULT_JOIN_TIMEOUT_SECONDS: u64 = 30;

/// Session controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Class clock tick interval (default: 1s).
    pub tick_interval_seconds: u64,

    /// Session mailbox buffer size (default: 500).
    pub mailbox_buffer: usize,

    /// Timeout applied to each remote step of `join()` (default: 30s).
    pub join_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_seconds: DEFAULT_TICK_INTERVAL_SECONDS,
            mailbox_buffer: DEFAULT_MAILBOX_BUFFER,
            join_timeout_seconds: DEFAULT_JOIN_TIMEOUT_SECONDS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let tick_interval_seconds = vars
            .get("CLASSROOM_TICK_INTERVAL_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TICK_INTERVAL_SECONDS);

        let mailbox_buffer = vars
            .get("CLASSROOM_MAILBOX_BUFFER")
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(DEFAULT_MAILBOX_BUFFER);

        let join_timeout_seconds = vars
            .get("CLASSROOM_JOIN_TIMEOUT_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_JOIN_TIMEOUT_SECONDS);

        Config {
            tick_interval_seconds,
            mailbox_buffer,
            join_timeout_seconds,
        }
    }

    /// Clock tick interval as a `Duration`.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }

    /// Per-step join timeout as a `Duration`.
    #[must_use]
    pub const fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_seconds)
    }
}
