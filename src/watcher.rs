//! Detects external writes to the data directory.
//!
//! Two instances pointed at the same data dir are not coordinated; the last
//! writer wins. Watching the blobs lets a host reload instead of rendering a
//! stale tree after another writer finishes.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::time::Duration;

#[derive(Debug, Clone)]
pub enum BlobEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl BlobEvent {
    pub fn path(&self) -> &Path {
        match self {
            BlobEvent::Created(p) | BlobEvent::Modified(p) | BlobEvent::Deleted(p) => p,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// File names inside the data dir worth reacting to.
    pub watched_files: Vec<String>,
    pub debounce_timeout_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            watched_files: vec![
                "tasks.json".to_string(),
                "board.json".to_string(),
                "notifications.json".to_string(),
                "searches.json".to_string(),
                "integrations.json".to_string(),
            ],
            debounce_timeout_ms: 500,
        }
    }
}

pub struct StoreWatcher {
    config: WatcherConfig,
    _event_tx: mpsc::UnboundedSender<BlobEvent>,
    _watcher: RecommendedWatcher,
}

impl StoreWatcher {
    pub fn new(
        data_dir: &Path,
        config: WatcherConfig,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<BlobEvent>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let tx_clone = event_tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if let Some(blob_event) = Self::process_notify_event(event) {
                        let _ = tx_clone.send(blob_event);
                    }
                }
            },
            Config::default(),
        )?;
        watcher.watch(data_dir, RecursiveMode::NonRecursive)?;
        println!("[INFO] Watching data directory: {:?}", data_dir);
        let store_watcher = Self {
            config,
            _event_tx: event_tx,
            _watcher: watcher,
        };
        Ok((store_watcher, event_rx))
    }

    fn process_notify_event(event: Event) -> Option<BlobEvent> {
        use notify::EventKind;
        let path = event.paths.first()?.clone();
        match event.kind {
            EventKind::Create(_) => Some(BlobEvent::Created(path)),
            EventKind::Modify(_) => Some(BlobEvent::Modified(path)),
            EventKind::Remove(_) => Some(BlobEvent::Deleted(path)),
            _ => None,
        }
    }

    /// Only the known blob files matter; backups and stray files in the data
    /// dir are ignored.
    pub fn is_watched_blob(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.config.watched_files.iter().any(|f| f == name))
    }
}

/// Collapses bursts of events (editors and atomic-rename writers fire several
/// per save) into one batch per path.
pub struct EventDebouncer {
    timeout: Duration,
    pending_events: std::collections::HashMap<PathBuf, BlobEvent>,
}

impl EventDebouncer {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            pending_events: std::collections::HashMap::new(),
        }
    }

    pub async fn add_event(&mut self, event: BlobEvent) -> Option<Vec<BlobEvent>> {
        self.pending_events.insert(event.path().to_path_buf(), event);
        tokio::time::sleep(self.timeout).await;
        if self.pending_events.is_empty() {
            None
        } else {
            Some(self.flush())
        }
    }

    pub fn flush(&mut self) -> Vec<BlobEvent> {
        self.pending_events
            .drain()
            .map(|(_, event)| event)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[test]
    fn test_watched_blob_names() {
        let temp_dir = TempDir::new().unwrap();
        let (watcher, _rx) =
            StoreWatcher::new(temp_dir.path(), WatcherConfig::default()).unwrap();
        assert!(watcher.is_watched_blob(&temp_dir.path().join("tasks.json")));
        assert!(!watcher.is_watched_blob(&temp_dir.path().join("tasks_backup_x.json")));
        assert!(!watcher.is_watched_blob(&temp_dir.path().join("other.txt")));
    }

    #[tokio::test]
    async fn test_event_debouncer_batches() {
        let mut debouncer = EventDebouncer::new(50);
        let event = BlobEvent::Modified(PathBuf::from("tasks.json"));
        let result = timeout(Duration::from_millis(500), debouncer.add_event(event)).await;
        let batch = result.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
    }
}
