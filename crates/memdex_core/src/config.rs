//! Store configuration.

use std::time::Duration;

/// Configuration for creating a document store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Quiet period after the last insert/update/delete before the
    /// aggregate change event fires.
    pub change_debounce: Duration,

    /// Whether to start the background notifier and deliver events.
    pub notifications: bool,

    /// Default upsert policy for `insert`.
    pub upsert: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            change_debounce: Duration::from_millis(1000),
            notifications: true,
            upsert: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the change event debounce period.
    #[must_use]
    pub const fn change_debounce(mut self, value: Duration) -> Self {
        self.change_debounce = value;
        self
    }

    /// Sets whether events are delivered at all.
    #[must_use]
    pub const fn notifications(mut self, value: bool) -> Self {
        self.notifications = value;
        self
    }

    /// Sets the default upsert policy.
    #[must_use]
    pub const fn upsert(mut self, value: bool) -> Self {
        self.upsert = value;
        self
    }
}
