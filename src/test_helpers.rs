//! Test utilities for creating temporary log files and recording observer notifications.

use crate::error::Error;
use crate::subscription::{Observer, Subscription};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub struct TempLogFile {
    pub path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TempLogFile {
    /// Create a new, empty temporary log file
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("test.log");
        File::create(&path)?;

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// A path inside a fresh temporary directory that does not exist yet
    pub fn missing() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("missing.log");

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a temporary log file holding `Line 1` up to `Line {count}`
    pub fn with_lines(count: usize) -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        temp_file.append_lines(1, count)?;
        Ok(temp_file)
    }

    /// Append `count` lines numbered from `start`, in the `Line N` format
    pub fn append_lines(&self, start: usize, count: usize) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        for i in start..start + count {
            writeln!(file, "Line {}", i)?;
        }
        file.flush()
    }

    /// Append one line terminated by a newline
    pub fn append_content(&self, content: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", content)?;
        file.flush()
    }

    /// Append raw bytes without adding a terminator
    pub fn append_raw(&self, content: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(content)?;
        file.flush()
    }

    /// Truncate the file in place (simulate copy-truncate rotation)
    pub fn truncate(&self) -> std::io::Result<()> {
        File::create(&self.path)?;
        Ok(())
    }

    /// Replace the file by a new one under the same name (simulate rename rotation)
    pub fn replace(&self, content: &str) -> std::io::Result<()> {
        let staged = self.path.with_extension("rotated");
        fs::write(&staged, content)?;
        fs::rename(&staged, &self.path)
    }

    /// Delete the file
    pub fn remove(&self) -> std::io::Result<()> {
        fs::remove_file(&self.path)
    }

    /// Get the path to the temporary file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One notification seen by a [`Recorder`].
#[derive(Debug)]
pub enum Notification<T> {
    Next(T),
    Rotated,
    Error(Error),
}

struct Recorded<T> {
    notifications: Vec<Notification<T>>,
    subscription: Option<Subscription>,
}

/// Observer that records everything it is told; clones share the same log.
pub struct Recorder<T> {
    inner: Arc<Mutex<Recorded<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recorded {
                notifications: Vec::new(),
                subscription: None,
            })),
        }
    }

    pub fn values(&self) -> Vec<T> {
        self.inner
            .lock()
            .notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Notification kinds in arrival order: `next`, `rotated` or `error`
    pub fn kinds(&self) -> Vec<&'static str> {
        self.inner
            .lock()
            .notifications
            .iter()
            .map(|n| match n {
                Notification::Next(_) => "next",
                Notification::Rotated => "rotated",
                Notification::Error(_) => "error",
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().notifications.is_empty()
    }

    pub fn rotations(&self) -> usize {
        self.count(|n| matches!(n, Notification::Rotated))
    }

    pub fn error_count(&self) -> usize {
        self.count(|n| matches!(n, Notification::Error(_)))
    }

    /// True when the first recorded error satisfies `predicate`
    pub fn error_matches(&self, predicate: impl Fn(&Error) -> bool) -> bool {
        self.inner
            .lock()
            .notifications
            .iter()
            .find_map(|n| match n {
                Notification::Error(error) => Some(predicate(error)),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// The subscription handed over in `on_subscribe`
    pub fn subscription(&self) -> Option<Subscription> {
        self.inner.lock().subscription.clone()
    }

    /// Poll until `predicate` holds or `timeout` elapses
    pub async fn wait_until(&self, timeout: Duration, predicate: impl Fn(&Self) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if predicate(self) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub async fn wait_for_values(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |r| r.values().len() >= count).await
    }

    pub async fn wait_for_error(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |r| r.error_count() > 0).await
    }

    fn count(&self, predicate: impl Fn(&Notification<T>) -> bool) -> usize {
        self.inner
            .lock()
            .notifications
            .iter()
            .filter(|n| predicate(n))
            .count()
    }
}

impl<T: Send + 'static> Observer<T> for Recorder<T> {
    fn on_subscribe(&mut self, subscription: &Subscription) {
        self.inner.lock().subscription = Some(subscription.clone());
    }

    fn on_next(&mut self, value: T) {
        self.inner.lock().notifications.push(Notification::Next(value));
    }

    fn on_rotated(&mut self) {
        self.inner.lock().notifications.push(Notification::Rotated);
    }

    fn on_error(&mut self, error: Error) {
        self.inner.lock().notifications.push(Notification::Error(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_log_file_creation() {
        let temp_file = TempLogFile::new().unwrap();
        assert!(temp_file.path().exists());
    }

    #[test]
    fn test_with_lines() {
        let temp_file = TempLogFile::with_lines(2).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "Line 1\nLine 2\n");
    }

    #[test]
    fn test_truncate() {
        let temp_file = TempLogFile::with_lines(3).unwrap();
        temp_file.truncate().unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_replace_swaps_content() {
        let temp_file = TempLogFile::with_lines(3).unwrap();
        temp_file.replace("fresh\n").unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "fresh\n");
    }

    #[test]
    fn test_missing_does_not_exist() {
        let temp_file = TempLogFile::missing().unwrap();
        assert!(!temp_file.path().exists());
    }
}
