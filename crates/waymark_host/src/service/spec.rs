//! Static description of a service: identity, timer, subscriptions.

use std::time::Duration;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// What the manager needs to know before starting a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Unique among the services of one manager
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Period of `on_tick`. The first tick comes one full period after start.
    pub tick_interval: Option<Duration>,
    /// Event patterns: exact type, `prefix/*`, or `*`
    pub subscriptions: Vec<String>,
    /// Upper bound for `on_stop`
    pub shutdown_timeout: Duration,
}

impl ServiceSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            tick_interval: None,
            subscriptions: Vec::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Tick every `interval`; zero means no timer
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn subscribe(mut self, pattern: impl Into<String>) -> Self {
        self.subscriptions.push(pattern.into());
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether an event of this type should reach the service
    pub(crate) fn wants(&self, event_type: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|pattern| super::event::pattern_matches(pattern, event_type))
    }
}
