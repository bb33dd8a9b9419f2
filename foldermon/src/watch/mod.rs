//! Filesystem change notifications for the watched directory.
//!
//! A single non-recursive `notify` subscription feeds two channels: one for
//! events and one for errors reported by the notification backend. Whether
//! files created inside sub-directories are reported depends on the platform
//! backend; no sub-directory watches are added.

pub mod settle;

use crate::utils::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::info;

/// Event half of the observer channels
pub type EventReceiver = UnboundedReceiver<Event>;

/// Error half of the observer channels
pub type ErrorReceiver = UnboundedReceiver<notify::Error>;

/// Live subscription on one directory.
///
/// Dropping the observer stops the subscription and closes both channels.
pub struct ChangeObserver {
    _watcher: RecommendedWatcher,
    events: EventReceiver,
    errors: ErrorReceiver,
}

impl ChangeObserver {
    /// Subscribe to changes directly inside `path`
    pub fn watch(path: &Path) -> Result<Self> {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();

        // Runs on the backend's thread. Sends fail only once the receivers are dropped.
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => {
                    let _ = error_tx.send(e);
                }
            }
        })?;

        watcher.watch(path, RecursiveMode::NonRecursive)?;
        info!("Subscribed to changes in {}", path.display());

        Ok(Self {
            _watcher: watcher,
            events,
            errors,
        })
    }

    /// Both receiving ends, borrowed for the dispatch loop
    pub fn channels(&mut self) -> (&mut EventReceiver, &mut ErrorReceiver) {
        (&mut self.events, &mut self.errors)
    }
}

/// Only creations trigger a backup run
pub fn is_creation(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_))
}
