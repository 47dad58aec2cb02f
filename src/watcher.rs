//! Change notifications for the followed file, using the notify crate.
//!
//! The follow loop still polls on a fixed interval; a watcher only lets it
//! wake up before the interval elapses.

use crate::error::Result;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::debug;

/// Watches the parent directory of a file and reports changes to that file.
pub(crate) struct FileWatcher {
    watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
    file_path: PathBuf,
    file_name: String,
}

impl FileWatcher {
    /// Creates a new file watcher for the specified path.
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Self {
            watcher,
            receiver: rx,
            file_path,
            file_name,
        })
    }

    /// Starts watching the directory holding the file, so the file may come and go.
    pub(crate) fn start_watching(&mut self) -> Result<()> {
        let watch_path = self.file_path.parent().unwrap_or(&self.file_path);
        self.watcher.watch(watch_path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    /// Resolves on the next change to the followed file.
    ///
    /// Never resolves once the underlying watcher has shut down.
    pub(crate) async fn changed(&mut self) {
        loop {
            match self.receiver.recv().await {
                Some(Ok(event)) => {
                    if is_change_event(&event.kind)
                        && is_event_relevant_to_file(&event, &self.file_name)
                    {
                        return;
                    }
                }
                Some(Err(e)) => debug!(error = %e, "ignoring file watcher error"),
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Discards notifications that are already queued.
    pub(crate) fn drain(&mut self) {
        while self.receiver.try_recv().is_ok() {}
    }

    #[cfg(test)]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Check if a notify event is relevant to a specific file
pub(crate) fn is_event_relevant_to_file(event: &Event, target_file_name: &str) -> bool {
    event.paths.iter().any(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy() == target_file_name)
            .unwrap_or(false)
    })
}

/// Content or presence changes; reads and metadata updates do not count.
fn is_change_event(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}
