//! Typed builder describing what a subscription delivers.
//!
//! A [`Tail`] starts out delivering raw lines and is reshaped by chaining
//! operators before subscribing:
//!
//! ```rust,no_run
//! use log_follower::{follow, Error, Observer};
//!
//! struct Print;
//!
//! impl Observer<Vec<(u64, String)>> for Print {
//!     fn on_next(&mut self, window: Vec<(u64, String)>) {
//!         println!("{:?}", window);
//!     }
//!
//!     fn on_error(&mut self, error: Error) {
//!         eprintln!("{}", error);
//!     }
//! }
//!
//! # async fn run() -> log_follower::Result<()> {
//! let subscription = follow("app.log").indexed().window(10)?.subscribe(Print).await?;
//! subscription.dispose();
//! # Ok(())
//! # }
//! ```

use crate::config::{FollowConfig, Schedule};
use crate::error::{BoxError, Error, Result};
use crate::follow::FollowLoop;
use crate::operators::{Indexed, Pipeline, Window};
use crate::stream::{ChannelObserver, LogStream};
use crate::subscription::{Emitter, Observer, Subscription};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A follow waiting to be subscribed, delivering values of type `T`.
pub struct Tail<T> {
    path: PathBuf,
    config: FollowConfig,
    pipeline: Pipeline<T>,
}

impl Tail<String> {
    /// Follows `path`, delivering every line as-is.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: FollowConfig::default(),
            pipeline: Box::new(Ok::<String, Error>),
        }
    }
}

impl<T: Send + 'static> Tail<T> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: FollowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.poll_interval(interval);
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.config = self.config.separator(separator);
        self
    }

    pub fn start_at_end(mut self, start_at_end: bool) -> Self {
        self.config = self.config.start_at_end(start_at_end);
        self
    }

    pub fn watch_changes(mut self, watch: bool) -> Self {
        self.config = self.config.watch_changes(watch);
        self
    }

    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.config = self.config.schedule(schedule);
        self
    }

    /// Pairs each value with its 1-based position in the follow.
    pub fn indexed(self) -> Tail<(u64, T)> {
        let mut indexed = Indexed::new();
        self.chain(move |value| Ok(indexed.stamp(value)))
    }

    /// Transforms each value.
    pub fn map<U, F>(self, mut f: F) -> Tail<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        self.chain(move |value| Ok(f(value)))
    }

    /// Transforms each value with a step that may fail.
    ///
    /// A failure ends the subscription with [`Error::Transform`] and stops
    /// following the file.
    pub fn try_map<U, E, F>(self, mut f: F) -> Tail<U>
    where
        U: Send + 'static,
        E: Into<BoxError>,
        F: FnMut(T) -> std::result::Result<U, E> + Send + 'static,
    {
        self.chain(move |value| f(value).map_err(|e| Error::Transform(e.into())))
    }

    /// Delivers the `size` most recent values on every new value.
    pub fn window(self, size: usize) -> Result<Tail<Vec<T>>>
    where
        T: Clone,
    {
        let mut window = Window::new(size)?;
        Ok(self.chain(move |value| Ok(window.push(value))))
    }

    /// Starts following and pushes values to `observer`.
    ///
    /// With [`Schedule::Background`] the follow runs on a spawned task and this
    /// returns right away. With [`Schedule::Inline`] the follow runs on the
    /// calling task and this returns once the subscription has stopped; the
    /// observer receives the handle in [`Observer::on_subscribe`] to stop it.
    pub async fn subscribe<O>(self, observer: O) -> Result<Subscription>
    where
        O: Observer<T> + 'static,
    {
        let schedule = self.config.schedule;
        match schedule {
            Schedule::Background => self.spawn(Box::new(observer)),
            Schedule::Inline => {
                let (subscription, token, follow) = self.prepare(Box::new(observer))?;
                follow.run(token).await;
                Ok(subscription)
            }
        }
    }

    /// Follows in the background and yields values as a stream.
    ///
    /// The configured schedule is ignored. Dropping the stream stops the follow.
    pub fn into_stream(self) -> Result<LogStream<T>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.spawn(Box::new(ChannelObserver::new(tx)))?;
        Ok(LogStream::new(rx, subscription))
    }

    fn spawn(self, observer: Box<dyn Observer<T>>) -> Result<Subscription> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let (subscription, token, follow) = self.prepare(observer)?;
        runtime.spawn(follow.run(token));
        Ok(subscription)
    }

    fn prepare(
        self,
        mut observer: Box<dyn Observer<T>>,
    ) -> Result<(Subscription, CancellationToken, FollowLoop<Emitter<T>>)> {
        self.config.validate()?;
        let path = resolve_path(&self.path)?;

        let subscription = Subscription::new();
        observer.on_subscribe(&subscription);

        let emitter = Emitter::new(
            subscription.clone(),
            self.pipeline,
            observer,
            path.display().to_string(),
        );
        let follow = FollowLoop::new(path, self.config, emitter);

        let token = CancellationToken::new();
        subscription.set_once(token.clone());
        Ok((subscription, token, follow))
    }

    fn chain<U, F>(self, mut step: F) -> Tail<U>
    where
        F: FnMut(T) -> Result<U> + Send + 'static,
    {
        let mut inner = self.pipeline;
        Tail {
            path: self.path,
            config: self.config,
            pipeline: Box::new(move |line| step(inner(line)?)),
        }
    }
}

/// Anchors relative paths to the current working directory.
fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_config("path must not be empty"));
    }
    Ok(std::path::absolute(path)?)
}
