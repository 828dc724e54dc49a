//! Periodic refresh of the dashboard from a sample source.
//!
//! The scheduler runs one tokio task. Every tick it fetches a batch on the
//! blocking pool (bounded by a timeout), appends it through the dashboard
//! and tells subscribers that new data arrived.
//!
//! # Lifecycle
//!
//! ```text
//!   Idle ──start()──▶ Running ──stop()──▶ Stopped
//!                      │   ▲
//!                      └───┘ tick
//! ```
//!
//! A stopped scheduler cannot be restarted. `stop()` never waits for an
//! in-flight fetch; the tick re-checks the state under the same lock
//! `stop()` takes before touching the store, so once `stop()` returns the
//! store no longer changes.
//!
//! At most one fetch is in flight. A fetch that overruns its timeout is
//! counted as a failure for that tick but keeps running; later ticks wait
//! on it instead of starting another, and its batch is applied when it
//! finally arrives.

use crate::activity::SharedActivityLog;
use crate::collector::{BoxedSource, Sample};
use crate::config::Config;
use crate::core::Dashboard;
use crate::error::{FetchError, FetchResult, InvalidConfigError};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Notification sent after every completed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// `count` samples were accepted; `last_timestamp` is the newest stored
    DataArrived {
        count: usize,
        last_timestamp: Option<DateTime<Utc>>,
    },
}

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Errors from scheduler lifecycle calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Scheduler was stopped; create a new one to restart")]
    AlreadyStopped,

    #[error("Invalid scheduler timing: {0}")]
    InvalidConfig(#[from] InvalidConfigError),
}

/// Timing for the refresh loop.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

impl SchedulerConfig {
    /// Both durations must be non-zero.
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if self.interval.is_zero() {
            return Err(InvalidConfigError::ZeroDuration("refresh interval"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(InvalidConfigError::ZeroDuration("fetch timeout"));
        }
        Ok(())
    }
}

impl From<&Config> for SchedulerConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.refresh_interval,
            fetch_timeout: config.fetch_timeout,
        }
    }
}

type Subscribers = Arc<Mutex<Vec<Sender<RefreshEvent>>>>;

/// Periodic trigger that feeds a dashboard.
pub struct RefreshScheduler {
    config: SchedulerConfig,
    dashboard: Arc<Dashboard>,
    source: Arc<Mutex<BoxedSource>>,
    activity: SharedActivityLog,
    state: Arc<Mutex<SchedulerState>>,
    subscribers: Subscribers,
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(
        config: SchedulerConfig,
        dashboard: Arc<Dashboard>,
        source: BoxedSource,
        activity: SharedActivityLog,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            config,
            dashboard,
            source: Arc::new(Mutex::new(source)),
            activity,
            state: Arc::new(Mutex::new(SchedulerState::Idle)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            stop_tx,
            handle: None,
        }
    }

    /// Receive a `RefreshEvent` after every tick.
    pub fn subscribe(&self) -> Receiver<RefreshEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Start ticking. Must be called from within a tokio runtime.
    ///
    /// The first tick fires immediately. Invalid timing is rejected and
    /// leaves the scheduler idle.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        self.config.validate()?;
        {
            let mut state = self.state.lock();
            match *state {
                SchedulerState::Running => return Err(SchedulerError::AlreadyRunning),
                SchedulerState::Stopped => return Err(SchedulerError::AlreadyStopped),
                SchedulerState::Idle => *state = SchedulerState::Running,
            }
        }

        let worker = TickWorker {
            config: self.config,
            dashboard: self.dashboard.clone(),
            source: self.source.clone(),
            activity: self.activity.clone(),
            state: self.state.clone(),
            subscribers: self.subscribers.clone(),
        };
        let stop_rx = self.stop_tx.subscribe();

        tracing::info!(
            "Refresh scheduler started (interval {:?}, fetch timeout {:?})",
            self.config.interval,
            self.config.fetch_timeout
        );
        self.handle = Some(tokio::spawn(worker.run(stop_rx)));
        Ok(())
    }

    /// Stop ticking. Returns without waiting for an in-flight fetch.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state == SchedulerState::Stopped {
            return;
        }
        *state = SchedulerState::Stopped;
        let _ = self.stop_tx.send(true);
        tracing::info!("Refresh scheduler stopped");
    }

    /// Stop and wait for the task to exit.
    pub async fn join(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Refresh task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved into the spawned task.
struct TickWorker {
    config: SchedulerConfig,
    dashboard: Arc<Dashboard>,
    source: Arc<Mutex<BoxedSource>>,
    activity: SharedActivityLog,
    state: Arc<Mutex<SchedulerState>>,
    subscribers: Subscribers,
}

type FetchTask = JoinHandle<FetchResult<Vec<Sample>>>;

impl TickWorker {
    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: Option<FetchTask> = None;

        loop {
            if *stop_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let mut task = match in_flight.take() {
                Some(task) => {
                    tracing::debug!("Previous fetch still running, waiting on it");
                    task
                }
                None => self.spawn_fetch(self.dashboard.last_timestamp()),
            };

            let waited = tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                waited = tokio::time::timeout(self.config.fetch_timeout, &mut task) => waited,
            };

            let batch = match waited {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(FetchError::Aborted(join_err.to_string())),
                Err(_) => {
                    in_flight = Some(task);
                    Err(FetchError::Timeout(self.config.fetch_timeout))
                }
            };

            let batch = match batch {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!("Refresh tick fetch failed: {}", e);
                    self.activity.record_fetch_failure();
                    Vec::new()
                }
            };

            // Holding the state lock across the append keeps stop() ordered
            // with respect to store mutation.
            let report = {
                let state = self.state.lock();
                if *state != SchedulerState::Running {
                    break;
                }
                self.dashboard.ingest(batch)
            };

            self.activity.record_tick(&report);
            tracing::debug!(
                "Tick appended {} samples ({} rejected, {} evicted)",
                report.accepted,
                report.rejected_count(),
                report.evicted
            );

            self.publish(RefreshEvent::DataArrived {
                count: report.accepted,
                last_timestamp: self.dashboard.last_timestamp(),
            });
        }

        tracing::debug!("Refresh task exiting");
    }

    fn spawn_fetch(&self, since: Option<DateTime<Utc>>) -> FetchTask {
        let source = self.source.clone();
        tokio::task::spawn_blocking(move || source.lock().fetch(since))
    }

    fn publish(&self, event: RefreshEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityLog;
    use crate::collector::SimulatedSource;

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_millis(20),
            fetch_timeout: Duration::from_millis(500),
        }
    }

    fn scheduler() -> RefreshScheduler {
        let dashboard = Arc::new(Dashboard::new(&Config::default()).unwrap());
        let source = Box::new(SimulatedSource::seeded(100, 10, 11).unwrap());
        RefreshScheduler::new(fast_config(), dashboard, source, Arc::new(ActivityLog::in_memory()))
    }

    #[test]
    fn test_default_scheduler_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(10));
        let from_config = SchedulerConfig::from(&Config::default());
        assert_eq!(from_config.interval, Duration::from_secs(10));
        assert_eq!(from_config.fetch_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_state_machine() {
        let mut scheduler = scheduler();
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        assert_eq!(scheduler.start(), Err(SchedulerError::AlreadyRunning));

        scheduler.join().await;
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(scheduler.start(), Err(SchedulerError::AlreadyStopped));
    }

    #[tokio::test]
    async fn test_first_tick_is_immediate() {
        let mut scheduler = scheduler();
        let events = scheduler.subscribe();
        scheduler.start().unwrap();

        let event = tokio::task::spawn_blocking(move || events.recv_timeout(Duration::from_secs(2)))
            .await
            .unwrap()
            .unwrap();
        match event {
            RefreshEvent::DataArrived { count, last_timestamp } => {
                assert_eq!(count, 100);
                assert!(last_timestamp.is_some());
            }
        }
        scheduler.join().await;
    }

    #[tokio::test]
    async fn test_stop_before_start_prevents_ticks() {
        let mut scheduler = scheduler();
        scheduler.stop();
        assert_eq!(scheduler.start(), Err(SchedulerError::AlreadyStopped));
        assert_eq!(scheduler.dashboard.len(), 0);
    }

    #[tokio::test]
    async fn test_zero_timing_rejected_and_stays_idle() {
        let mut scheduler = scheduler();
        scheduler.config.interval = Duration::ZERO;
        assert_eq!(
            scheduler.start(),
            Err(SchedulerError::InvalidConfig(InvalidConfigError::ZeroDuration(
                "refresh interval"
            )))
        );
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.config = SchedulerConfig {
            interval: Duration::from_millis(20),
            fetch_timeout: Duration::ZERO,
        };
        assert!(matches!(
            scheduler.start(),
            Err(SchedulerError::InvalidConfig(_))
        ));
        assert!(scheduler.handle.is_none());
        assert_eq!(scheduler.dashboard.len(), 0);
    }
}
