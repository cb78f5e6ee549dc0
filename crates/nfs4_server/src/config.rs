use std::time::Duration;

use crate::state::DEFAULT_LEASE_TIME;

/// Tunables of a server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfsServerConfig {
    /// How long a client keeps its state without renewing it.
    pub lease_time: Duration,
    /// How long answered xids are remembered to detect retransmissions.
    pub transaction_retention: Duration,
    /// Requests a single client may have in progress at once.
    pub max_in_flight: u16,
    /// Answered transactions remembered per client.
    pub trim_limit: usize,
    /// Period of the background cleaners.
    pub cleanup_interval: Duration,
}

impl Default for NfsServerConfig {
    fn default() -> Self {
        Self {
            lease_time: DEFAULT_LEASE_TIME,
            transaction_retention: Duration::from_secs(60),
            max_in_flight: 128,
            trim_limit: 1024,
            cleanup_interval: Duration::from_secs(10),
        }
    }
}

impl NfsServerConfig {
    #[must_use]
    pub const fn with_lease_time(mut self, lease_time: Duration) -> Self {
        self.lease_time = lease_time;
        self
    }

    #[must_use]
    pub const fn with_transaction_retention(mut self, retention: Duration) -> Self {
        self.transaction_retention = retention;
        self
    }

    #[must_use]
    pub const fn with_max_in_flight(mut self, max_in_flight: u16) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }
}
