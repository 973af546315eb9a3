use crate::watcher::DEFAULT_MAX_EVENTS;

/// Address the supervisor listens on unless told otherwise.
pub const DEFAULT_ADDRESS: &str = "localhost:8080";

/// Supervisor settings.
///
/// There is no configuration file; values come from the command line or
/// from [`SupervisorBuilder`](crate::SupervisorBuilder).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// `host:port` to listen on.
    pub address: String,
    /// Events collected per wait, per watcher.
    pub max_events: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_owned(),
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}
