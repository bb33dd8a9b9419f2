//! The monitor loop.
//!
//! One dispatch loop consumes watcher events, watcher errors and the shutdown
//! signal. A creation event runs settle → archive → relocate → retention to
//! completion before the next message is taken, so at most one bundle is
//! ever being built.

pub mod shutdown;

use crate::config::{Config, Targets};
use crate::executor::{BackupExecutor, BackupResult};
use crate::utils::Result;
use crate::watch::settle::Settle;
use crate::watch::{is_creation, ChangeObserver, ErrorReceiver, EventReceiver};
use notify::Event;
use shutdown::ShutdownCoordinator;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

pub struct Monitor {
    executor: BackupExecutor,
    settle: Settle,
    continue_on_error: bool,
}

impl Monitor {
    pub fn new(targets: Targets, config: &Config) -> Self {
        Self {
            executor: BackupExecutor::new(targets, &config.monitor),
            settle: Settle::from_config(&config.monitor),
            continue_on_error: config.monitor.continue_on_error,
        }
    }

    pub fn executor(&self) -> &BackupExecutor {
        &self.executor
    }

    /// Consume notifications until a channel closes or shutdown is signalled.
    ///
    /// Returns the first archive error unless `continue_on_error` is set.
    pub async fn run(
        &self,
        events: &mut EventReceiver,
        errors: &mut ErrorReceiver,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        info!("Watcher event channel closed");
                        return Ok(());
                    }
                },
                error = errors.recv() => match error {
                    Some(e) => warn!("Watcher error: {}", e),
                    None => {
                        info!("Watcher error channel closed");
                        return Ok(());
                    }
                },
                _ = shutdown.recv() => {
                    info!("Shutdown requested, stopping monitor");
                    return Ok(());
                }
            }
        }
    }

    async fn handle_event(&self, event: Event) -> Result<()> {
        if !is_creation(&event.kind) {
            debug!("Ignoring {:?} for {:?}", event.kind, event.paths);
            return Ok(());
        }

        let created = event.paths.first();
        match created {
            Some(path) => info!("Detected new file: {}", path.display()),
            None => info!("Detected new file"),
        }

        self.settle.wait(created.map(|p| p.as_path())).await;

        match self.archive().await {
            Ok(result) => {
                info!(
                    "Backup complete: {} ({} files, {} bytes, {} ms)",
                    result.bundle_path.display(),
                    result.total_files,
                    result.total_bytes,
                    result.duration_ms
                );
                Ok(())
            }
            Err(e) if self.continue_on_error => {
                error!("Error during archive and move: {} (continuing)", e);
                Ok(())
            }
            Err(e) => {
                error!("Error during archive and move: {}", e);
                Err(e)
            }
        }
    }

    /// Run the blocking archive pass off the async worker and wait for it
    async fn archive(&self) -> Result<BackupResult> {
        let executor = self.executor.clone();
        tokio::task::spawn_blocking(move || executor.execute()).await?
    }
}

/// Set up the backup directory and subscription, then run the monitor until
/// it stops. Setup failures are returned before any archive is written.
pub async fn run(targets: Targets, config: Config) -> Result<()> {
    info!("Watching folder: {}", targets.watch_dir.display());
    info!("Backup folder: {}", targets.backup_dir.display());

    let monitor = Monitor::new(targets, &config);
    monitor.executor().prepare()?;

    if backup_inside_watch(monitor.executor().targets()) {
        warn!(
            "Backup folder {} is inside the watched folder; bundles will be archived and may retrigger runs",
            monitor.executor().targets().backup_dir.display()
        );
    }

    let mut observer = ChangeObserver::watch(&monitor.executor().targets().watch_dir)?;

    let coordinator = ShutdownCoordinator::new();
    let shutdown_rx = coordinator.subscribe();
    tokio::spawn(async move {
        coordinator.wait_for_signal().await;
    });

    let (events, errors) = observer.channels();
    monitor.run(events, errors, shutdown_rx).await?;

    info!("Folder monitor stopped");
    Ok(())
}

/// Whether the backup directory resolves to a location under the watched one.
/// Both directories must exist; otherwise the answer is `false`.
fn backup_inside_watch(targets: &Targets) -> bool {
    match (
        std::fs::canonicalize(&targets.watch_dir),
        std::fs::canonicalize(&targets.backup_dir),
    ) {
        (Ok(watch), Ok(backup)) => backup.starts_with(watch),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use notify::event::{CreateKind, ModifyKind};
    use notify::EventKind;
    use std::fs;
    use std::io::Read;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn quick_config() -> Config {
        Config {
            monitor: MonitorConfig {
                debounce_ms: 0,
                ..MonitorConfig::default()
            },
            ..Config::default()
        }
    }

    fn targets(watch: &Path, backup: &Path) -> Targets {
        Targets {
            watch_dir: watch.to_path_buf(),
            backup_dir: backup.to_path_buf(),
        }
    }

    fn created(path: PathBuf) -> Event {
        Event::new(EventKind::Create(CreateKind::File)).add_path(path)
    }

    fn bundles_in(dir: &Path) -> Vec<PathBuf> {
        let mut bundles: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "zip"))
            .collect();
        bundles.sort();
        bundles
    }

    #[tokio::test]
    async fn test_creation_event_archives_watch_dir() -> Result<()> {
        let watch = TempDir::new()?;
        let backup = TempDir::new()?;
        fs::write(watch.path().join("a.txt"), b"hello")?;
        fs::create_dir(watch.path().join("sub"))?;
        fs::write(watch.path().join("sub/b.txt"), b"world")?;

        let monitor = Monitor::new(targets(watch.path(), backup.path()), &quick_config());
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let (_error_tx, mut errors) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        event_tx.send(created(watch.path().join("sub/b.txt"))).unwrap();
        drop(event_tx);
        monitor.run(&mut events, &mut errors, shutdown_rx).await?;

        let bundles = bundles_in(backup.path());
        assert_eq!(bundles.len(), 1);

        let mut archive = zip::ZipArchive::new(fs::File::open(&bundles[0])?)?;
        assert_eq!(archive.len(), 2);
        for (name, expected) in [("a.txt", "hello"), ("sub/b.txt", "world")] {
            let mut content = String::new();
            archive.by_name(name)?.read_to_string(&mut content)?;
            assert_eq!(content, expected);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_non_creation_events_are_ignored() -> Result<()> {
        let watch = TempDir::new()?;
        let backup = TempDir::new()?;
        fs::write(watch.path().join("a.txt"), b"hello")?;

        let monitor = Monitor::new(targets(watch.path(), backup.path()), &quick_config());
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let (_error_tx, mut errors) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let path = watch.path().join("a.txt");
        event_tx
            .send(Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.clone()))
            .unwrap();
        event_tx
            .send(Event::new(EventKind::Remove(notify::event::RemoveKind::File)).add_path(path))
            .unwrap();
        drop(event_tx);
        monitor.run(&mut events, &mut errors, shutdown_rx).await?;

        assert!(bundles_in(backup.path()).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_watcher_errors_do_not_stop_loop() -> Result<()> {
        let watch = TempDir::new()?;
        let backup = TempDir::new()?;

        let monitor = Monitor::new(targets(watch.path(), backup.path()), &quick_config());
        let (_event_tx, mut events) = mpsc::unbounded_channel();
        let (error_tx, mut errors) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        error_tx.send(notify::Error::generic("queue overflow")).unwrap();
        error_tx.send(notify::Error::generic("again")).unwrap();
        drop(error_tx);

        // Both errors are consumed, then the closed channel ends the loop
        monitor.run(&mut events, &mut errors, shutdown_rx).await?;
        assert!(errors.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() -> Result<()> {
        let watch = TempDir::new()?;
        let backup = TempDir::new()?;

        let monitor = Monitor::new(targets(watch.path(), backup.path()), &quick_config());
        let (_event_tx, mut events) = mpsc::unbounded_channel();
        let (_error_tx, mut errors) = mpsc::unbounded_channel();
        let coordinator = ShutdownCoordinator::new();
        let shutdown_rx = coordinator.subscribe();

        coordinator.trigger();
        monitor.run(&mut events, &mut errors, shutdown_rx).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_archive_failure_stops_monitor() -> Result<()> {
        let root = TempDir::new()?;
        let backup = TempDir::new()?;
        let watch = root.path().join("vanished");

        let monitor = Monitor::new(targets(&watch, backup.path()), &quick_config());
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let (_error_tx, mut errors) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        event_tx.send(created(watch.join("a.txt"))).unwrap();
        event_tx.send(created(watch.join("b.txt"))).unwrap();

        let result = monitor.run(&mut events, &mut errors, shutdown_rx).await;
        assert!(result.is_err());
        // The second event was never taken
        assert!(events.try_recv().is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_continue_on_error_keeps_watching() -> Result<()> {
        let root = TempDir::new()?;
        let backup = TempDir::new()?;
        let watch = root.path().join("vanished");

        let mut config = quick_config();
        config.monitor.continue_on_error = true;
        let monitor = Monitor::new(targets(&watch, backup.path()), &config);
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let (_error_tx, mut errors) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        event_tx.send(created(watch.join("a.txt"))).unwrap();
        event_tx.send(created(watch.join("b.txt"))).unwrap();
        drop(event_tx);

        monitor.run(&mut events, &mut errors, shutdown_rx).await?;
        assert!(events.try_recv().is_err());
        Ok(())
    }

    #[test]
    fn test_backup_inside_watch_resolves_paths() -> Result<()> {
        let root = TempDir::new()?;
        let watch = root.path().join("w");
        let sibling = root.path().join("backups");
        fs::create_dir_all(watch.join("b"))?;
        fs::create_dir(&sibling)?;

        // Un-normalized spelling of w/b
        let roundabout = root.path().join("backups/../w/./b");
        assert!(backup_inside_watch(&targets(&watch, &roundabout)));
        assert!(!backup_inside_watch(&targets(&watch, &sibling)));
        assert!(!backup_inside_watch(&targets(&watch, &root.path().join("missing"))));

        #[cfg(unix)]
        {
            let link = root.path().join("link-to-w");
            std::os::unix::fs::symlink(&watch, &link)?;
            assert!(backup_inside_watch(&targets(&watch, &link.join("b"))));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_watch_dir_fails_setup() -> Result<()> {
        let root = TempDir::new()?;
        let backup = root.path().join("backups");

        let result = run(targets(&root.path().join("missing"), &backup), quick_config()).await;

        assert!(result.is_err());
        assert!(bundles_in(&backup).is_empty());
        Ok(())
    }
}
