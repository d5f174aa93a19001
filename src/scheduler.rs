//! Fixed-interval cycle trigger.
//!
//! The scheduler fires once immediately (the cold cycle) and then every
//! `schedule.poll_interval_ms`. Each trigger spawns the cycle on its own task
//! so the timer keeps ticking; an `Idle`/`Running` guard makes sure at most
//! one cycle is in flight. A trigger that arrives while a cycle is still
//! running is skipped, not queued.
//!
//! Shutdown stops the ticker first and then waits on [`SchedulerState::wait_idle`]
//! so a cycle that is mid fan-out finishes before the store is closed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::pipeline::{CycleError, CycleReport, Pipeline};

/// Run state shared between the scheduler and observers such as `/health`.
#[derive(Default)]
pub struct SchedulerState {
    running: AtomicBool,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    last: Mutex<Option<LastCycle>>,
    idle: Notify,
}

/// Outcome of the most recent finished cycle.
#[derive(Debug, Clone, Serialize)]
pub struct LastCycle {
    pub finished_at: DateTime<Utc>,
    pub ok: bool,
    pub report: Option<CycleReport>,
    pub error: Option<String>,
}

/// Point-in-time copy of [`SchedulerState`].
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    pub running: bool,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub last: Option<LastCycle>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolve once no cycle is running.
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a concurrent guard drop is not missed.
            let notified = self.idle.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }

    /// Move Idle → Running. Returns `None` when a cycle is already running.
    pub fn try_begin(self: &Arc<Self>) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard {
                state: Arc::clone(self),
            })
    }

    fn record(&self, outcome: &Result<CycleReport, CycleError>) {
        let last = match outcome {
            Ok(report) => {
                self.completed.fetch_add(1, Ordering::SeqCst);
                LastCycle {
                    finished_at: Utc::now(),
                    ok: true,
                    report: Some(*report),
                    error: None,
                }
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                LastCycle {
                    finished_at: Utc::now(),
                    ok: false,
                    report: None,
                    error: Some(e.to_string()),
                }
            }
        };
        if let Ok(mut slot) = self.last.lock() {
            *slot = Some(last);
        }
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            running: self.is_running(),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            last: self.last.lock().ok().and_then(|slot| slot.clone()),
        }
    }
}

/// Holds the Running state; dropping it returns to Idle, including on panic.
pub struct RunGuard {
    state: Arc<SchedulerState>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
        self.state.idle.notify_waiters();
    }
}

pub struct Scheduler {
    pipeline: Arc<Pipeline>,
    interval: Duration,
    state: Arc<SchedulerState>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<Pipeline>, interval: Duration) -> Self {
        Self {
            pipeline,
            interval,
            state: Arc::new(SchedulerState::new()),
        }
    }

    pub fn state(&self) -> Arc<SchedulerState> {
        Arc::clone(&self.state)
    }

    /// Tick forever. The first tick completes immediately.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs(), "scheduler started");

        loop {
            ticker.tick().await;
            self.trigger();
        }
    }

    /// Start a cycle in the background unless one is already running.
    ///
    /// Returns the task handle when a cycle was started.
    pub fn trigger(&self) -> Option<tokio::task::JoinHandle<()>> {
        let Some(guard) = self.state.try_begin() else {
            self.state.skipped.fetch_add(1, Ordering::SeqCst);
            warn!("previous cycle still running, skipping this trigger");
            return None;
        };

        let pipeline = Arc::clone(&self.pipeline);
        let state = Arc::clone(&self.state);
        Some(tokio::spawn(async move {
            let _guard = guard;
            run_once(&pipeline, &state).await;
        }))
    }
}

/// Run one cycle and record its outcome. Failures are logged, never propagated.
pub async fn run_once(pipeline: &Pipeline, state: &SchedulerState) {
    info!("cycle started");
    let outcome = pipeline.run_cycle().await;
    match &outcome {
        Ok(report) => info!(
            candidates = report.candidates,
            new = report.new_records,
            sent = report.notifications.delivered,
            failed_sends = report.notifications.failed,
            "cycle finished"
        ),
        Err(e @ CycleError::Fetch(_)) => warn!(error = %e, "cycle skipped, treating as zero candidates"),
        Err(e @ CycleError::Persistence(_)) => error!(error = %e, "cycle aborted before notification"),
    }
    state.record(&outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_rejects_second_begin_until_dropped() {
        let state = Arc::new(SchedulerState::new());
        let guard = state.try_begin().expect("idle state should start");
        assert!(state.is_running());
        assert!(state.try_begin().is_none());
        drop(guard);
        assert!(!state.is_running());
        assert!(state.try_begin().is_some());
    }

    #[tokio::test]
    async fn test_wait_idle_resolves_when_guard_drops() {
        let state = Arc::new(SchedulerState::new());
        state.wait_idle().await;

        let guard = state.try_begin().expect("idle state should start");
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.wait_idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert!(!state.is_running());
    }

    #[test]
    fn test_snapshot_starts_empty() {
        let state = SchedulerState::new();
        let snap = state.snapshot();
        assert!(!snap.running);
        assert_eq!(snap.completed + snap.failed + snap.skipped, 0);
        assert!(snap.last.is_none());
    }
}
