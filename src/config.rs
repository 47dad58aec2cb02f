//! Follow configuration.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default delay between two polls of the followed file.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default line separator.
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Where the follow loop of a subscription runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    /// Spawn the loop on the current tokio runtime and return immediately.
    #[default]
    Background,
    /// Drive the loop on the caller's task; `subscribe` returns once the
    /// subscription has stopped.
    Inline,
}

/// Settings for a single follow.
#[derive(Debug, Clone)]
pub struct FollowConfig {
    /// Fixed delay between polls.
    pub poll_interval: Duration,
    /// Line terminator.
    pub separator: String,
    /// Skip the content already present when following starts.
    pub start_at_end: bool,
    /// Wake up early when the file system reports a change to the file.
    pub watch_changes: bool,
    /// Execution context of the follow loop.
    pub schedule: Schedule,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            separator: DEFAULT_SEPARATOR.to_string(),
            start_at_end: false,
            watch_changes: true,
            schedule: Schedule::default(),
        }
    }
}

impl FollowConfig {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn start_at_end(mut self, start_at_end: bool) -> Self {
        self.start_at_end = start_at_end;
        self
    }

    pub fn watch_changes(mut self, watch: bool) -> Self {
        self.watch_changes = watch;
        self
    }

    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Rejects settings the follow loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::invalid_config("poll interval must be greater than zero"));
        }
        if self.separator.is_empty() {
            return Err(Error::invalid_config("separator must not be empty"));
        }
        Ok(())
    }
}
