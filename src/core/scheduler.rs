//! Periodic polling of active demand.
//!
//! The scheduler owns a single timer task. Each timer tick spawns a
//! [`PollScheduler::tick`]; ticks never overlap, an attempt to start one
//! while another is in flight returns [`TickOutcome::Skipped`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::models::AccountId;
use super::service::Service;
use super::sync::lock_or_recover;

/// Why a pair refresh wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownAccount,
    MissingExternalId,
    RejectedCredentials,
    NoOrchestrator,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UnknownAccount => "account not in configuration",
            Self::MissingExternalId => "no uid configured for service",
            Self::RejectedCredentials => "credentials rejected",
            Self::NoOrchestrator => "no orchestrator registered for service",
        };
        f.write_str(label)
    }
}

/// Result of refreshing one `(account, service)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This many entries were written to the cache.
    Committed(usize),
    /// No registration asks for this pair.
    NoDemand,
    Skipped(SkipReason),
}

impl RefreshOutcome {
    #[must_use]
    pub const fn committed(self) -> usize {
        match self {
            Self::Committed(n) => n,
            Self::NoDemand | Self::Skipped(_) => 0,
        }
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was still running.
    Skipped,
    Completed { pairs: usize, committed: usize },
}

/// What the scheduler polls. Implemented by the sync core.
#[async_trait]
pub trait PairRefresher: Send + Sync {
    fn active_demand(&self) -> BTreeMap<AccountId, BTreeSet<Service>>;

    async fn refresh_pair(&self, account_id: &str, service: Service) -> RefreshOutcome;
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct TickState {
    refresher: Arc<dyn PairRefresher>,
    in_flight: AtomicBool,
}

impl TickState {
    async fn tick(&self) -> TickOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            tracing::debug!("Tick already in flight, skipping");
            return TickOutcome::Skipped;
        };

        let pairs: Vec<(AccountId, Service)> = self
            .refresher
            .active_demand()
            .into_iter()
            .flat_map(|(account, services)| {
                services
                    .into_iter()
                    .map(move |service| (account.clone(), service))
            })
            .collect();

        let outcomes = join_all(
            pairs
                .iter()
                .map(|(account, service)| self.refresher.refresh_pair(account, *service)),
        )
        .await;

        let committed = outcomes.iter().map(|o| o.committed()).sum();
        tracing::debug!(pairs = pairs.len(), committed, "Tick complete");
        TickOutcome::Completed {
            pairs: pairs.len(),
            committed,
        }
    }
}

/// Timer-driven poller over a [`PairRefresher`].
pub struct PollScheduler {
    state: Arc<TickState>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    #[must_use]
    pub fn new(refresher: Arc<dyn PairRefresher>, interval: Duration) -> Self {
        Self {
            state: Arc::new(TickState {
                refresher,
                in_flight: AtomicBool::new(false),
            }),
            interval,
            timer: Mutex::new(None),
        }
    }

    /// Start the timer on `handle`. The first tick fires immediately.
    ///
    /// Does nothing when already running or when nothing is demanded.
    /// Returns whether a timer was started.
    pub fn start(&self, handle: &Handle) -> bool {
        let mut timer = lock_or_recover(&self.timer);
        if timer.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }
        if self.state.refresher.active_demand().is_empty() {
            tracing::trace!("No demand, scheduler stays stopped");
            return false;
        }
        *timer = Some(self.spawn_timer(handle));
        true
    }

    /// Start or stop the timer so that it runs exactly when there is demand.
    ///
    /// Demand is read while the timer lock is held, so concurrent callers
    /// settle on the state left by the last registry change. Without a
    /// `handle` the timer can only be stopped. Returns whether it is running.
    pub fn reconcile(&self, handle: Option<&Handle>) -> bool {
        let mut timer = lock_or_recover(&self.timer);
        let running = timer.as_ref().is_some_and(|t| !t.is_finished());
        let demanded = !self.state.refresher.active_demand().is_empty();

        match (demanded, running, handle) {
            (true, false, Some(handle)) => {
                *timer = Some(self.spawn_timer(handle));
                true
            }
            (false, true, _) => {
                if let Some(task) = timer.take() {
                    task.abort();
                }
                tracing::info!("No demand left, polling stopped");
                false
            }
            _ => running,
        }
    }

    fn spawn_timer(&self, handle: &Handle) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let period = self.interval;
        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    state.tick().await;
                });
            }
        });
        tracing::info!(interval_secs = period.as_secs(), "Polling started");
        task
    }

    /// Abort the timer. In-flight ticks run to completion.
    pub fn stop(&self) {
        if let Some(timer) = lock_or_recover(&self.timer).take() {
            timer.abort();
            tracing::info!("Polling stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock_or_recover(&self.timer)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Refresh every demanded pair concurrently, unless a tick is already running.
    pub async fn tick(&self) -> TickOutcome {
        self.state.tick().await
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
