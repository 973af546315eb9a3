//! Fluent builder for Supervisor construction.

use crate::config::Config;
use crate::supervisor::Supervisor;

/// Builder for constructing [`Supervisor`] instances with fluent API.
///
/// # Example
/// ```ignore
/// let supervisor = SupervisorBuilder::new()
///     .address("127.0.0.1:9000")
///     .max_events(32)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct SupervisorBuilder {
    config: Config,
}

impl SupervisorBuilder {
    /// Creates a builder holding the default [`Config`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `host:port` to listen on.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    /// Sets how many events each watcher collects per wait.
    ///
    /// Zero is raised to one.
    pub fn max_events(mut self, max_events: usize) -> Self {
        self.config.max_events = max_events.max(1);
        self
    }

    /// Consumes the builder and returns the configured [`Supervisor`].
    pub fn build(self) -> Supervisor {
        Supervisor::with_config(self.config)
    }
}
