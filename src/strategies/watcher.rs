//! Polling file-change watcher.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

/// What identifies one version of the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

async fn fingerprint(path: &Path) -> Option<Fingerprint> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    Some(Fingerprint {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}

/// Watches one file for write or size changes.
///
/// Each detected change sends one notification. The polling task stops when the
/// watcher is dropped or the receiver goes away.
pub struct FileWatcher {
    task: JoinHandle<()>,
}

impl FileWatcher {
    pub fn spawn(path: impl Into<PathBuf>, poll: Duration) -> (Self, mpsc::Receiver<()>) {
        let path = path.into();
        let (tx, rx) = mpsc::channel(1);
        let task = tokio::spawn(async move {
            let mut last = fingerprint(&path).await;
            let mut ticker = interval(poll);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let current = fingerprint(&path).await;
                if current == last {
                    continue;
                }
                last = current;
                debug!(path = %path.display(), "Watched file changed");
                // A pending notification already covers this change.
                if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(()) {
                    break;
                }
            }
        });
        (Self { task }, rx)
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
