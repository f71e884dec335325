//! The version poller and its background timer task.
//!
//! A [`Poller`] compares the version reported by a [`VersionSource`] against
//! the version it was constructed with. [`Poller::start`] fires a check every
//! `poll_interval`. Each firing runs its check as a separate task, so a slow
//! request never delays the next firing and several checks can be in flight
//! at once. The first check that sees a different version wins the transition
//! to [`PollerState::Reloading`] and calls the [`Reloader`]; the timer then
//! ends.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::PollerConfig;
use crate::error::{CheckError, PollerError, PollerResult};
use crate::reload::{ReloadEvent, Reloader};
use crate::source::{HttpVersionSource, VersionSource};
use crate::version::{Version, VersionState};

/// Lifecycle state of a poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Checking on every timer firing
    Running,
    /// A version change was found and the reload has been handed off. Terminal.
    Reloading,
}

/// Result of one check cycle
#[derive(Debug)]
pub enum CheckOutcome {
    /// Server version equals the baseline
    Unchanged,
    /// Server version differed and the reloader ran
    Reloaded(ReloadEvent),
    /// The cycle failed; logged and left for the next firing
    Failed(CheckError),
    /// Another cycle already triggered the reload
    AlreadyReloading,
}

/// Why the polling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerExit {
    /// A reload was triggered
    Reloaded,
    /// [`PollerHandle::shutdown`] or a [`StopSignal`] was used
    Stopped,
}

struct PollerInner {
    config: PollerConfig,
    version_state: VersionState,
    source: Arc<dyn VersionSource>,
    reloader: Arc<dyn Reloader>,

    reloading: AtomicBool,
    /// Wakes the polling loop once a reload has completed
    reloaded: Notify,

    checks_started: AtomicU64,
    checks_completed: AtomicU64,
    failures: AtomicU64,
    reloads: AtomicU64,
}

/// Polls a version source and reloads when the version changes.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

impl Poller {
    /// Create a poller with an explicit version source
    pub fn new(
        config: PollerConfig,
        current_version: impl Into<Version>,
        source: Arc<dyn VersionSource>,
        reloader: Arc<dyn Reloader>,
    ) -> PollerResult<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(PollerInner {
                config,
                version_state: VersionState::new(current_version),
                source,
                reloader,
                reloading: AtomicBool::new(false),
                reloaded: Notify::new(),
                checks_started: AtomicU64::new(0),
                checks_completed: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                reloads: AtomicU64::new(0),
            }),
        })
    }

    /// Create a poller that fetches the version over HTTP from `config.base_url`
    pub fn http(
        config: PollerConfig,
        current_version: impl Into<Version>,
        reloader: Arc<dyn Reloader>,
    ) -> PollerResult<Self> {
        let source = HttpVersionSource::new(&config)?;
        Self::new(config, current_version, Arc::new(source), reloader)
    }

    /// Start the repeating timer.
    ///
    /// The first check runs one interval after this call. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        let poller = self.clone();
        let task_handle = tokio::spawn(async move { poller.polling_loop(shutdown_rx).await });

        PollerHandle {
            poller: self.clone(),
            task_handle,
            shutdown_tx,
            started_at: SystemTime::now(),
        }
    }

    /// Main polling loop
    async fn polling_loop(self, mut shutdown_rx: mpsc::Receiver<()>) -> PollerExit {
        let period = self.inner.config.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight = JoinSet::new();

        tracing::info!(
            "Watching {} for version changes (baseline: {}, interval: {:?})",
            self.inner.config.base_url,
            self.inner.version_state.baseline(),
            period
        );

        let exit = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.state() == PollerState::Reloading {
                        continue;
                    }
                    let poller = self.clone();
                    in_flight.spawn(async move { poller.tick().await });
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                _ = self.inner.reloaded.notified() => break PollerExit::Reloaded,
                Some(()) = shutdown_rx.recv() => break PollerExit::Stopped,
            }
        };

        // Checks still in flight belong to a context that is going away
        in_flight.abort_all();

        tracing::debug!("Polling loop ended: {:?}", exit);
        exit
    }

    /// Run one check cycle.
    ///
    /// Never returns an error: failures are logged and reported as
    /// [`CheckOutcome::Failed`].
    pub async fn tick(&self) -> CheckOutcome {
        if self.state() == PollerState::Reloading {
            return CheckOutcome::AlreadyReloading;
        }

        let inner = &self.inner;
        inner.checks_started.fetch_add(1, Ordering::Relaxed);

        let outcome = match inner.source.fetch_version().await {
            Ok(fetched) if !inner.version_state.is_outdated_by(&fetched) => {
                tracing::trace!("Server version unchanged: {}", fetched);
                CheckOutcome::Unchanged
            }
            Ok(fetched) => self.reload(fetched).await,
            Err(e) => CheckOutcome::Failed(e),
        };

        if let CheckOutcome::Failed(ref e) = outcome {
            inner.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Reload check failed: {}", e);
        }

        inner.checks_completed.fetch_add(1, Ordering::Relaxed);
        outcome
    }

    async fn reload(&self, fetched: Version) -> CheckOutcome {
        let inner = &self.inner;

        if inner
            .reloading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return CheckOutcome::AlreadyReloading;
        }

        let event = ReloadEvent {
            previous: inner.version_state.baseline().clone(),
            current: fetched,
        };

        tracing::info!(
            "Server version changed ({} -> {}), reloading",
            event.previous,
            event.current
        );

        match inner.reloader.reload(&event).await {
            Ok(()) => {
                inner.reloads.fetch_add(1, Ordering::Relaxed);
                inner.reloaded.notify_one();
                CheckOutcome::Reloaded(event)
            }
            Err(e) => {
                // Back to running so the next firing tries again
                inner.reloading.store(false, Ordering::Release);
                CheckOutcome::Failed(e.into())
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> PollerState {
        if self.inner.reloading.load(Ordering::Acquire) {
            PollerState::Reloading
        } else {
            PollerState::Running
        }
    }

    /// The baseline this poller compares against
    pub fn version_state(&self) -> &VersionState {
        &self.inner.version_state
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    /// Snapshot of the poller's counters
    pub fn stats(&self) -> PollerStats {
        let inner = &self.inner;
        PollerStats {
            baseline: inner.version_state.baseline().clone(),
            state: self.state(),
            poll_interval: inner.config.poll_interval,
            checks_started: inner.checks_started.load(Ordering::Relaxed),
            checks_completed: inner.checks_completed.load(Ordering::Relaxed),
            failures: inner.failures.load(Ordering::Relaxed),
            reloads: inner.reloads.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.inner.config)
            .field("version_state", &self.inner.version_state)
            .field("state", &self.state())
            .finish()
    }
}

/// Handle to a started poller
#[derive(Debug)]
pub struct PollerHandle {
    poller: Poller,
    task_handle: JoinHandle<PollerExit>,
    shutdown_tx: mpsc::Sender<()>,
    started_at: SystemTime,
}

impl PollerHandle {
    /// The poller driven by this handle
    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// When the timer was started
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Check if the polling loop is still running
    pub fn is_running(&self) -> bool {
        !self.task_handle.is_finished()
    }

    /// A cloneable signal that stops the loop from elsewhere
    pub fn stop_signal(&self) -> StopSignal {
        StopSignal {
            sender: self.shutdown_tx.clone(),
        }
    }

    /// Wait for the polling loop to end on its own
    pub async fn join(self) -> PollerResult<PollerExit> {
        self.task_handle
            .await
            .map_err(|e| PollerError::TaskJoin(format!("Failed to await polling task: {e}")))
    }

    /// Stop the polling loop and wait for it to end.
    ///
    /// Returns [`PollerExit::Reloaded`] if a reload beat the stop request.
    pub async fn shutdown(self) -> PollerResult<PollerExit> {
        // Full means a stop is already queued; closed means the loop already ended
        let _ = self.shutdown_tx.try_send(());
        self.join().await
    }
}

/// Stops a running poller
#[derive(Debug, Clone)]
pub struct StopSignal {
    sender: mpsc::Sender<()>,
}

impl StopSignal {
    pub fn stop(&self) {
        let _ = self.sender.try_send(());
    }
}

/// Statistics for a poller
#[derive(Debug, Clone)]
pub struct PollerStats {
    pub baseline: Version,
    pub state: PollerState,
    pub poll_interval: Duration,
    pub checks_started: u64,
    pub checks_completed: u64,
    pub failures: u64,
    pub reloads: u64,
}

impl PollerStats {
    /// Checks started but not yet finished
    pub fn in_flight(&self) -> u64 {
        self.checks_started.saturating_sub(self.checks_completed)
    }
}

impl fmt::Display for PollerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Poller Stats:")?;
        writeln!(f, "  Baseline version: {}", self.baseline)?;
        writeln!(f, "  State: {:?}", self.state)?;
        writeln!(f, "  Interval: {:?}", self.poll_interval)?;
        writeln!(
            f,
            "  Checks: {} completed, {} in flight",
            self.checks_completed,
            self.in_flight()
        )?;
        writeln!(f, "  Failures: {}", self.failures)?;
        write!(f, "  Reloads: {}", self.reloads)
    }
}
