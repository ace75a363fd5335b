//! Session settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a room session.
///
/// ```rust
/// use std::time::Duration;
/// use roomwire_session::SessionConfig;
///
/// let config = SessionConfig::default()
///     .ping_interval(Duration::ZERO)
///     .max_events_per_pump(64);
/// assert!(!config.pings_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How often `pump` sends a ping while in a room. `Duration::ZERO`
    /// turns automatic pings off; [`Session::ping`](crate::Session::ping)
    /// still works.
    pub ping_interval: Duration,

    /// Upper bound on events handled by one `pump` call, so a burst
    /// can't starve the caller's loop. 0 means drain everything queued.
    pub max_events_per_pump: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            max_events_per_pump: 0,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    #[must_use]
    pub fn max_events_per_pump(mut self, max: usize) -> Self {
        self.max_events_per_pump = max;
        self
    }

    pub fn pings_enabled(&self) -> bool {
        !self.ping_interval.is_zero()
    }
}
