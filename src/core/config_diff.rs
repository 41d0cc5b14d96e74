//! Configuration diffing.
//!
//! Snapshots pushed into the [`DiffWatcher`] are debounced; once the stream
//! has been quiet for the debounce window the latest snapshot is compared with
//! the previous one and the resulting [`ConfigDiff`] is applied.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::models::AccountId;
use super::snapshot::ConfigSnapshot;
use super::sync::lock_or_recover;

/// What changed between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    /// Accounts removed or whose credentials changed, sorted.
    pub invalidate: Vec<AccountId>,
    /// Display preferences changed.
    pub renotify: bool,
}

impl ConfigDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invalidate.is_empty() && !self.renotify
    }
}

/// Applies a diff to live state.
pub trait DiffHandler: Send + Sync {
    fn apply(&self, diff: &ConfigDiff);
}

/// Remembers the last snapshot and compares the next one against it.
#[derive(Debug, Default)]
pub struct DiffEngine {
    previous: Option<ConfigSnapshot>,
}

impl DiffEngine {
    #[must_use]
    pub const fn new(initial: Option<ConfigSnapshot>) -> Self {
        Self { previous: initial }
    }

    /// Compare `next` with the stored snapshot, then store a copy of `next`.
    ///
    /// The first snapshot ever seen only establishes the baseline.
    pub fn diff(&mut self, next: &ConfigSnapshot) -> ConfigDiff {
        let diff = self
            .previous
            .as_ref()
            .map(|previous| compare(previous, next))
            .unwrap_or_default();
        self.previous = Some(next.clone());
        diff
    }
}

fn compare(previous: &ConfigSnapshot, next: &ConfigSnapshot) -> ConfigDiff {
    // BTreeMap iteration keeps the list sorted.
    let invalidate = previous
        .accounts
        .iter()
        .filter(|(id, old)| {
            next.accounts
                .get(*id)
                .is_none_or(|new| new.credentials.differs_from(&old.credentials))
        })
        .map(|(id, _)| id.clone())
        .collect();

    ConfigDiff {
        invalidate,
        renotify: previous.preferences != next.preferences,
    }
}

/// Debounced snapshot queue.
///
/// Snapshots pushed before [`DiffWatcher::start`] wait in the queue.
pub struct DiffWatcher {
    sender: UnboundedSender<ConfigSnapshot>,
    receiver: Mutex<Option<UnboundedReceiver<ConfigSnapshot>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DiffWatcher {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            task: Mutex::new(None),
        }
    }

    /// Queue a snapshot for diffing.
    pub fn push(&self, snapshot: ConfigSnapshot) {
        if self.sender.send(snapshot).is_err() {
            tracing::warn!("Diff watcher closed, dropping snapshot");
        }
    }

    /// Spawn the debounce loop. Only the first call has an effect.
    pub fn start(
        &self,
        handle: &Handle,
        engine: DiffEngine,
        handler: Arc<dyn DiffHandler>,
        debounce: Duration,
    ) {
        let Some(receiver) = lock_or_recover(&self.receiver).take() else {
            tracing::warn!("Diff watcher already started");
            return;
        };
        let task = handle.spawn(run(receiver, engine, handler, debounce));
        *lock_or_recover(&self.task) = Some(task);
    }

    pub fn stop(&self) {
        if let Some(task) = lock_or_recover(&self.task).take() {
            task.abort();
        }
    }
}

impl Default for DiffWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DiffWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    mut receiver: UnboundedReceiver<ConfigSnapshot>,
    mut engine: DiffEngine,
    handler: Arc<dyn DiffHandler>,
    debounce: Duration,
) {
    while let Some(mut latest) = receiver.recv().await {
        let mut coalesced = 1usize;
        let closed = loop {
            match tokio::time::timeout(debounce, receiver.recv()).await {
                Ok(Some(next)) => {
                    latest = next;
                    coalesced += 1;
                }
                Ok(None) => break true,
                Err(_) => break false,
            }
        };

        let diff = engine.diff(&latest);
        tracing::debug!(
            coalesced,
            invalidate = diff.invalidate.len(),
            renotify = diff.renotify,
            "Config settled"
        );
        if !diff.is_empty() {
            handler.apply(&diff);
        }
        if closed {
            break;
        }
    }
}
