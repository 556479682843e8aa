//! Single-task focus stopwatch.
//!
//! Elapsed seconds accumulate only while `Running`, driven by a cancellable
//! one-second ticker task. Nothing is persisted until `complete`, which hands
//! the elapsed value to a [`CompleteTask`] sink in one update.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::store::CompleteTask;
use super::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FocusPhase {
    Idle,
    Ready,
    Running,
    Paused,
    Completing,
}

impl FocusPhase {
    pub fn label(self) -> &'static str {
        match self {
            FocusPhase::Idle => "Select a task",
            FocusPhase::Ready => "Ready to start",
            FocusPhase::Running => "Focusing...",
            FocusPhase::Paused => "Paused",
            FocusPhase::Completing => "Saving...",
        }
    }
}

#[derive(Debug, Error)]
pub enum FocusError {
    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        from: FocusPhase,
        action: &'static str,
    },

    #[error("no task selected")]
    NoTask,

    #[error("{0}")]
    Completion(#[source] ClientError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusSnapshot {
    pub phase: FocusPhase,
    pub task_id: Option<Uuid>,
    pub elapsed: u64,
    pub clock: String,
    pub label: &'static str,
}

/// `MM:SS`, or `HH:MM:SS` from one hour up.
pub fn format_clock(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[derive(Debug, Clone)]
struct FocusState {
    phase: FocusPhase,
    task_id: Option<Uuid>,
    elapsed: u64,
}

impl FocusState {
    fn new() -> Self {
        Self {
            phase: FocusPhase::Idle,
            task_id: None,
            elapsed: 0,
        }
    }

    fn reject(&self, action: &'static str) -> FocusError {
        FocusError::InvalidTransition {
            from: self.phase,
            action,
        }
    }

    /// Switching tasks drops any in-progress elapsed time.
    fn select(&mut self, task_id: Uuid) -> Result<(), FocusError> {
        if self.phase == FocusPhase::Completing {
            return Err(self.reject("select"));
        }
        if self.elapsed > 0 {
            debug!(discarded = self.elapsed, "task switch discards focus session");
        }
        self.task_id = Some(task_id);
        self.elapsed = 0;
        self.phase = FocusPhase::Ready;
        Ok(())
    }

    fn start(&mut self) -> Result<(), FocusError> {
        match self.phase {
            FocusPhase::Ready | FocusPhase::Paused => {
                self.phase = FocusPhase::Running;
                Ok(())
            }
            FocusPhase::Idle => Err(FocusError::NoTask),
            _ => Err(self.reject("start")),
        }
    }

    fn pause(&mut self) -> Result<(), FocusError> {
        if self.phase != FocusPhase::Running {
            return Err(self.reject("pause"));
        }
        self.phase = FocusPhase::Paused;
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), FocusError> {
        match self.phase {
            FocusPhase::Ready | FocusPhase::Running | FocusPhase::Paused => {
                *self = Self::new();
                Ok(())
            }
            _ => Err(self.reject("cancel")),
        }
    }

    fn begin_complete(&mut self) -> Result<(Uuid, u64), FocusError> {
        match self.phase {
            FocusPhase::Running | FocusPhase::Paused => {
                let task_id = self.task_id.ok_or(FocusError::NoTask)?;
                self.phase = FocusPhase::Completing;
                Ok((task_id, self.elapsed))
            }
            _ => Err(self.reject("complete")),
        }
    }

    fn finish_complete(&mut self, ok: bool) {
        if ok {
            *self = Self::new();
        } else {
            self.phase = FocusPhase::Paused;
        }
    }

    /// Returns false once the ticker should stop.
    fn tick(&mut self) -> bool {
        if self.phase != FocusPhase::Running {
            return false;
        }
        self.elapsed += 1;
        true
    }

    fn snapshot(&self) -> FocusSnapshot {
        FocusSnapshot {
            phase: self.phase,
            task_id: self.task_id,
            elapsed: self.elapsed,
            clock: format_clock(self.elapsed),
            label: self.phase.label(),
        }
    }
}

/// Handle to the running ticker task. Aborted when the last timer clone goes away.
#[derive(Default)]
struct Ticker {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct FocusTimer {
    state: Arc<Mutex<FocusState>>,
    ticker: Arc<Ticker>,
    tick_interval: Duration,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusTimer {
    pub fn new() -> Self {
        Self::with_tick_interval(Duration::from_secs(1))
    }

    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(FocusState::new())),
            ticker: Arc::new(Ticker::default()),
            tick_interval,
        }
    }

    pub async fn snapshot(&self) -> FocusSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn select(&self, task_id: Uuid) -> Result<FocusSnapshot, FocusError> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.select(task_id)?;
            state.snapshot()
        };
        self.cancel_ticker().await;
        debug!(%task_id, "focus task selected");
        Ok(snapshot)
    }

    pub async fn start(&self) -> Result<FocusSnapshot, FocusError> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.start()?;
            state.snapshot()
        };
        self.spawn_ticker().await;
        debug!(elapsed = snapshot.elapsed, "focus started");
        Ok(snapshot)
    }

    pub async fn pause(&self) -> Result<FocusSnapshot, FocusError> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.pause()?;
            state.snapshot()
        };
        self.cancel_ticker().await;
        debug!(elapsed = snapshot.elapsed, "focus paused");
        Ok(snapshot)
    }

    /// Discards the session. Nothing is written anywhere.
    pub async fn cancel(&self) -> Result<FocusSnapshot, FocusError> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.cancel()?;
            state.snapshot()
        };
        self.cancel_ticker().await;
        debug!("focus cancelled");
        Ok(snapshot)
    }

    /// Persists the elapsed seconds through `sink`. On failure the timer
    /// drops back to `Paused` with elapsed untouched so the caller can retry.
    pub async fn complete<C>(&self, sink: &mut C) -> Result<u64, FocusError>
    where
        C: CompleteTask + ?Sized,
    {
        let (task_id, elapsed) = self.state.lock().await.begin_complete()?;
        self.cancel_ticker().await;

        let outcome = sink.complete_task(task_id, elapsed).await;
        self.state.lock().await.finish_complete(outcome.is_ok());
        match outcome {
            Ok(()) => {
                debug!(%task_id, elapsed, "focus session completed");
                Ok(elapsed)
            }
            Err(e) => {
                warn!(%task_id, elapsed, error = %e, "focus completion failed");
                Err(FocusError::Completion(e))
            }
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.handle.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state: Weak<Mutex<FocusState>> = Arc::downgrade(&self.state);
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            loop {
                interval.tick().await;
                let Some(live) = state.upgrade() else {
                    break;
                };
                if !live.lock().await.tick() {
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.handle.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::store::fake::{form, FakeApi};
    use crate::client::TaskStore;
    use async_trait::async_trait;
    use tokio::time::sleep;

    /// Records what would have been persisted.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Uuid, u64)>,
        fail: bool,
    }

    #[async_trait]
    impl CompleteTask for Recorder {
        async fn complete_task(&mut self, task_id: Uuid, time_spent: u64) -> Result<(), ClientError> {
            if self.fail {
                return Err(ClientError::Api {
                    status: 500,
                    message: "Server error".into(),
                });
            }
            self.calls.push((task_id, time_spent));
            Ok(())
        }
    }

    #[test]
    fn clock_formats() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(125), "02:05");
        assert_eq!(format_clock(3599), "59:59");
        assert_eq!(format_clock(3600), "01:00:00");
        assert_eq!(format_clock(3725), "01:02:05");
    }

    #[test]
    fn transitions_from_idle() {
        let mut state = FocusState::new();
        assert!(matches!(state.start(), Err(FocusError::NoTask)));
        assert!(state.pause().is_err());
        assert!(state.cancel().is_err());
        assert!(state.begin_complete().is_err());
        assert!(!state.tick());
    }

    #[test]
    fn select_resets_elapsed() {
        let mut state = FocusState::new();
        state.select(Uuid::new_v4()).unwrap();
        state.start().unwrap();
        state.tick();
        state.tick();
        state.pause().unwrap();
        assert_eq!(state.elapsed, 2);

        let other = Uuid::new_v4();
        state.select(other).unwrap();
        assert_eq!(state.phase, FocusPhase::Ready);
        assert_eq!(state.task_id, Some(other));
        assert_eq!(state.elapsed, 0);
    }

    #[test]
    fn ticks_only_count_while_running() {
        let mut state = FocusState::new();
        state.select(Uuid::new_v4()).unwrap();
        assert!(!state.tick());
        state.start().unwrap();
        assert!(state.tick());
        state.pause().unwrap();
        assert!(!state.tick());
        assert_eq!(state.elapsed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_elapsed() {
        let timer = FocusTimer::new();
        timer.select(Uuid::new_v4()).await.unwrap();
        timer.start().await.unwrap();
        sleep(Duration::from_millis(3500)).await;
        let paused = timer.pause().await.unwrap();
        assert_eq!(paused.elapsed, 3);
        assert_eq!(paused.label, "Paused");

        sleep(Duration::from_secs(60)).await;
        assert_eq!(timer.snapshot().await.elapsed, 3);

        timer.start().await.unwrap();
        sleep(Duration::from_millis(2500)).await;
        assert_eq!(timer.snapshot().await.elapsed, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_running_timer_stops_its_ticker() {
        let timer = FocusTimer::new();
        timer.select(Uuid::new_v4()).await.unwrap();
        timer.start().await.unwrap();
        let state = timer.state.clone();
        let ticker = Arc::downgrade(&timer.ticker);

        drop(timer);
        assert!(ticker.upgrade().is_none());
        sleep(Duration::from_millis(5500)).await;

        let guard = state.lock().await;
        assert_eq!(guard.phase, FocusPhase::Running);
        assert_eq!(guard.elapsed, 0);
        drop(guard);
        assert_eq!(Arc::strong_count(&state), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_without_persisting() {
        let timer = FocusTimer::new();
        let mut sink = Recorder::default();
        timer.select(Uuid::new_v4()).await.unwrap();
        timer.start().await.unwrap();
        sleep(Duration::from_millis(10_500)).await;

        let snap = timer.cancel().await.unwrap();
        assert_eq!(snap.phase, FocusPhase::Idle);
        assert_eq!(snap.elapsed, 0);
        assert!(matches!(
            timer.complete(&mut sink).await,
            Err(FocusError::InvalidTransition { from: FocusPhase::Idle, .. })
        ));
        assert!(sink.calls.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_completion_returns_to_paused() {
        let timer = FocusTimer::new();
        let task = Uuid::new_v4();
        let mut sink = Recorder { fail: true, ..Recorder::default() };
        timer.select(task).await.unwrap();
        timer.start().await.unwrap();
        sleep(Duration::from_millis(7500)).await;

        let err = timer.complete(&mut sink).await.unwrap_err();
        assert_eq!(err.to_string(), "Server error");
        let snap = timer.snapshot().await;
        assert_eq!(snap.phase, FocusPhase::Paused);
        assert_eq!(snap.elapsed, 7);

        sink.fail = false;
        assert_eq!(timer.complete(&mut sink).await.unwrap(), 7);
        assert_eq!(sink.calls, vec![(task, 7)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_completion_is_rejected() {
        let timer = FocusTimer::new();
        let mut sink = Recorder::default();
        timer.select(Uuid::new_v4()).await.unwrap();
        timer.start().await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        timer.complete(&mut sink).await.unwrap();

        assert!(timer.cancel().await.is_err());
        assert_eq!(sink.calls.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn focus_session_records_time_on_task() {
        let api = FakeApi::default();
        let mut store = TaskStore::new(api.clone());
        store.create(&form("Write report", "2024-05-01")).await.unwrap();
        let id = store.tasks()[0].id;

        let timer = FocusTimer::new();
        timer.select(id).await.unwrap();
        timer.start().await.unwrap();
        sleep(Duration::from_millis(125_500)).await;
        assert_eq!(timer.snapshot().await.clock, "02:05");

        assert_eq!(timer.complete(&mut store).await.unwrap(), 125);
        let task = &store.tasks()[0];
        assert!(task.is_completed);
        assert_eq!(task.time_spent, 125);
        assert_eq!(timer.snapshot().await.phase, FocusPhase::Idle);
    }
}
