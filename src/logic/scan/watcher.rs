//! File-system watch for daemon mode
//!
//! Forwards the path of every newly created file in the watched directories
//! into an async channel the driver drains.

use std::path::{Path, PathBuf};

use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::walker::path_entries;

pub struct FileWatch {
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<PathBuf>,
    watched: Vec<PathBuf>,
}

impl FileWatch {
    /// Watch `directories` (non-recursively). Directories that cannot be
    /// watched are logged and left out.
    pub fn start(directories: &[PathBuf]) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_file_creation(&event.kind) {
                    return;
                }
                for path in event.paths {
                    log::info!("[Watch] Created: {}", path.display());
                    // Receiver gone means the daemon is stopping
                    let _ = tx.send(path);
                }
            }
            Err(e) => log::error!("[Watch] {}", e),
        })?;

        let mut watched = Vec::new();
        for directory in directories {
            match watcher.watch(directory, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    log::info!("[Watch] Watching {}", directory.display());
                    watched.push(directory.clone());
                }
                Err(e) => log::warn!("[Watch] Cannot watch {}: {}", directory.display(), e),
            }
        }

        Ok(Self {
            _watcher: watcher,
            rx,
            watched,
        })
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Next created file; `None` once the watcher is gone
    pub async fn next_created(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }
}

fn is_file_creation(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(k) if *k != CreateKind::Folder)
}

/// `$PATH` entries plus the user's download folder
pub fn watch_roots() -> Vec<PathBuf> {
    let mut roots = path_entries();
    if let Some(downloads) = dirs::download_dir() {
        roots.push(downloads);
    } else if let Some(home) = dirs::home_dir() {
        roots.push(home.join("Downloads"));
    }
    roots.retain(|p| Path::new(p).is_dir());
    roots
}
