//! Waiting for a newly created file to finish being written.

use crate::config::{MonitorConfig, SettleMode};
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Delay applied between a creation event and the archive run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    /// Sleep for a fixed duration
    Fixed(Duration),
    /// Poll the created file's size until two consecutive reads agree,
    /// giving up after `max_wait`
    StableSize { poll: Duration, max_wait: Duration },
}

impl Settle {
    pub fn from_config(config: &MonitorConfig) -> Self {
        match config.settle {
            SettleMode::Fixed => Settle::Fixed(config.debounce()),
            SettleMode::StableSize => Settle::StableSize {
                poll: config.stable_poll(),
                max_wait: config.stable_max_wait(),
            },
        }
    }

    /// Wait according to the strategy. `created` is the path reported by the
    /// creation event, if any.
    pub async fn wait(&self, created: Option<&Path>) {
        match self {
            Settle::Fixed(delay) => sleep(*delay).await,
            Settle::StableSize { poll, max_wait } => match created {
                Some(path) => wait_for_stable_size(path, *poll, *max_wait).await,
                None => sleep(*poll).await,
            },
        }
    }
}

async fn wait_for_stable_size(path: &Path, poll: Duration, max_wait: Duration) {
    let deadline = Instant::now() + max_wait;
    let mut last_size = file_size(path).await;

    loop {
        sleep(poll).await;
        let size = file_size(path).await;

        if size.is_none() || size == last_size {
            debug!("{} settled at {:?} bytes", path.display(), size);
            return;
        }
        if Instant::now() >= deadline {
            debug!("{} still growing after {:?}, continuing", path.display(), max_wait);
            return;
        }
        last_size = size;
    }
}

async fn file_size(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}
