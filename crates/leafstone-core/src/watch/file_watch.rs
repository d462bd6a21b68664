//! Poll-based watch on a single file

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Delivers a notification each time the watched file may have changed.
///
/// Notifications carry no payload; duplicates are expected and filtered by the
/// change detector, which compares file contents.
pub struct FileWatch {
    watcher: PollWatcher,
    path: PathBuf,
    events: mpsc::UnboundedReceiver<()>,
}

impl FileWatch {
    pub fn start(path: &Path, interval: Duration) -> Result<Self> {
        let (tx, events) = mpsc::unbounded_channel();

        let config = Config::default().with_poll_interval(interval);
        let mut watcher = PollWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    if !matches!(event.kind, EventKind::Access(_)) {
                        let _ = tx.send(());
                    }
                }
            },
            config,
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", path.display()))?;

        Ok(Self {
            watcher,
            path: path.to_path_buf(),
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next notification; `None` once the watcher is gone
    pub async fn changed(&mut self) -> Option<()> {
        self.events.recv().await
    }

    /// Stop watching; pending notifications are discarded
    pub fn unwatch(mut self) -> Result<()> {
        self.events.close();
        self.watcher
            .unwatch(&self.path)
            .with_context(|| format!("Failed to unwatch {}", self.path.display()))
    }
}
