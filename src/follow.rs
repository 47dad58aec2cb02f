//! The follow loop: poll the file, emit what was found, wait, repeat.
//!
//! ```text
//!            ┌──────────── Line / Rotated ───────────┐
//!            ▼                                        │
//! start ─► POLLING ── poll ─► emit ─► wait(interval │ file change)
//!            │
//!            └── NotFound / Error / cancelled / sink stop ─► STOPPED
//! ```
//!
//! The first poll runs without delay. The loop only waits when a poll found
//! no new lines, and cancellation interrupts the wait.

use crate::config::FollowConfig;
use crate::error::Error;
use crate::source::{self, FollowState, PollOutcome, SourceEvent};
use crate::watcher::FileWatcher;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Event handed from the follow loop to its sink.
#[derive(Debug)]
pub(crate) enum LineEvent {
    Line(String),
    NotFound,
    Rotated,
    Error(Error),
}

/// Whether the sink still wants events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Receiver of the events produced by a [`FollowLoop`].
pub(crate) trait Sink: Send {
    fn emit(&mut self, event: LineEvent) -> Flow;
}

pub(crate) struct FollowLoop<S> {
    state: FollowState,
    config: FollowConfig,
    sink: S,
}

impl<S: Sink> FollowLoop<S> {
    pub(crate) fn new(path: PathBuf, config: FollowConfig, sink: S) -> Self {
        Self {
            state: FollowState::new(path),
            config,
            sink,
        }
    }

    /// Runs until a terminal event, a sink stop, or cancellation.
    ///
    /// Returns the final polling state.
    pub(crate) async fn run(mut self, token: CancellationToken) -> FollowState {
        debug!(path = %self.state.path.display(), "follow started");

        let mut watcher = if self.config.watch_changes {
            self.install_watcher()
        } else {
            None
        };

        if self.config.start_at_end && !token.is_cancelled() {
            if let Err(e) = source::seek_to_end(&mut self.state, &self.config.separator).await {
                self.sink.emit(LineEvent::Error(e));
                return self.stopped("error");
            }
        }

        loop {
            if token.is_cancelled() {
                return self.stopped("cancelled");
            }
            if let Some(watcher) = watcher.as_mut() {
                watcher.drain();
            }

            let outcome = source::poll(&mut self.state, &self.config.separator).await;
            trace!(
                path = %self.state.path.display(),
                position = self.state.position,
                lines = outcome.lines.len(),
                "polled"
            );
            if token.is_cancelled() {
                return self.stopped("cancelled");
            }

            let idle = outcome.lines.is_empty();
            match self.deliver(outcome) {
                Delivery::Continue => {}
                Delivery::Terminated(reason) => return self.stopped(reason),
            }
            if !idle {
                continue;
            }

            let wake = async {
                match watcher.as_mut() {
                    Some(watcher) => watcher.changed().await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                biased;
                _ = token.cancelled() => return self.stopped("cancelled"),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = wake => {}
            }
        }
    }

    fn deliver(&mut self, outcome: PollOutcome) -> Delivery {
        let PollOutcome { lines, event } = outcome;
        match event {
            SourceEvent::NotFound => {
                self.sink.emit(LineEvent::NotFound);
                return Delivery::Terminated("not found");
            }
            SourceEvent::Error(e) => {
                self.sink.emit(LineEvent::Error(e));
                return Delivery::Terminated("error");
            }
            SourceEvent::Rotated => {
                debug!(path = %self.state.path.display(), "file rotated");
                if self.sink.emit(LineEvent::Rotated) == Flow::Stop {
                    return Delivery::Terminated("sink stopped");
                }
            }
            SourceEvent::Idle | SourceEvent::Appended => {}
        }

        for line in lines {
            trace!(index = self.state.next_index, "emitting line");
            if self.sink.emit(LineEvent::Line(line)) == Flow::Stop {
                return Delivery::Terminated("sink stopped");
            }
            self.state.next_index += 1;
        }
        Delivery::Continue
    }

    fn install_watcher(&self) -> Option<FileWatcher> {
        let installed = FileWatcher::new(&self.state.path).and_then(|mut watcher| {
            watcher.start_watching()?;
            Ok(watcher)
        });
        match installed {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(
                    path = %self.state.path.display(),
                    error = %e,
                    "file watcher unavailable, falling back to polling"
                );
                None
            }
        }
    }

    fn stopped(self, reason: &'static str) -> FollowState {
        debug!(
            path = %self.state.path.display(),
            lines = self.state.next_index - 1,
            reason,
            "follow stopped"
        );
        self.state
    }
}

enum Delivery {
    Continue,
    Terminated(&'static str),
}
