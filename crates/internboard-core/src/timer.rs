//! Work timer: a stopwatch bound to one task.
//!
//! The timer ticks once per second on a spawned tokio task while running.
//! Invalid transitions (starting a running timer, saving while running,
//! resetting another task's timer) are no-ops reported through the return
//! value, never errors. Only a failed save returns an error.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::TaskDetail;

const TICK: Duration = Duration::from_secs(1);

/// Condition under which reset and save act on the displayed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// Only when the timer is bound to the task currently displayed
    #[default]
    MatchOpenTask,
    /// Whenever the timer is stopped
    Unchecked,
}

#[derive(Error, Debug)]
pub enum TimerError {
    #[error("Failed to save tracked time: {0}")]
    Persistence(ApiError),

    /// The time was saved but the task could not be loaded again.
    #[error("Time saved, but reloading the task failed: {0}")]
    Reload(ApiError),
}

impl TimerError {
    pub fn api_error(&self) -> &ApiError {
        match self {
            TimerError::Persistence(e) | TimerError::Reload(e) => e,
        }
    }

    /// Whether the elapsed time reached the backend.
    pub fn is_saved(&self) -> bool {
        matches!(self, TimerError::Reload(_))
    }
}

#[derive(Debug, Default)]
struct Counter {
    elapsed: u64,
    /// Bumped on every stop. A ticker only counts while this still matches
    /// the value it was spawned with.
    run: u64,
}

type SharedCounter = Arc<Mutex<Counter>>;

// A poisoned lock still holds a valid counter
fn lock(counter: &SharedCounter) -> MutexGuard<'_, Counter> {
    counter.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct WorkTimer {
    task_id: Option<i64>,
    task_name: Option<String>,
    counter: SharedCounter,
    /// Some exactly while running
    ticker: Option<JoinHandle<()>>,
    guard: GuardPolicy,
}

impl WorkTimer {
    pub fn new(guard: GuardPolicy) -> Self {
        Self {
            task_id: None,
            task_name: None,
            counter: Arc::new(Mutex::new(Counter::default())),
            ticker: None,
            guard,
        }
    }

    pub fn task_id(&self) -> Option<i64> {
        self.task_id
    }

    pub fn task_name(&self) -> Option<&str> {
        self.task_name.as_deref()
    }

    pub fn elapsed(&self) -> u64 {
        lock(&self.counter).elapsed
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Attach the timer to a task. Ignored while running.
    pub fn bind(&mut self, task_id: i64, task_name: impl Into<String>, initial_elapsed: u64) -> bool {
        if self.is_running() {
            debug!(task_id, "Timer running, bind ignored");
            return false;
        }
        self.task_id = Some(task_id);
        self.task_name = Some(task_name.into());
        lock(&self.counter).elapsed = initial_elapsed;
        debug!(task_id, initial_elapsed, "Timer bound");
        true
    }

    /// Start ticking. Ignored if already running or not bound to a task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.is_running() || self.task_id.is_none() {
            return false;
        }
        let run = lock(&self.counter).run;
        self.ticker = Some(spawn_ticker(Arc::clone(&self.counter), run));
        debug!(task_id = ?self.task_id, elapsed = self.elapsed(), "Timer started");
        true
    }

    /// Stop ticking, keeping the elapsed time. Ignored if not running.
    ///
    /// No tick lands after this returns, even one already executing on
    /// another worker thread.
    pub fn stop(&mut self) -> bool {
        match self.ticker.take() {
            Some(handle) => {
                lock(&self.counter).run += 1;
                handle.abort();
                debug!(task_id = ?self.task_id, elapsed = self.elapsed(), "Timer stopped");
                true
            }
            None => false,
        }
    }

    fn guard_allows(&self, open_task_id: i64) -> bool {
        match self.guard {
            GuardPolicy::MatchOpenTask => self.task_id == Some(open_task_id),
            GuardPolicy::Unchecked => true,
        }
    }

    /// Discard unsaved time, going back to what `user_id` has on record for
    /// the open task (0 if nothing). Ignored while running or when the guard
    /// rejects the open task.
    pub fn reset(&mut self, open_task: &TaskDetail, user_id: Option<i64>) -> bool {
        if self.is_running() || !self.guard_allows(open_task.task.id) {
            return false;
        }
        let recorded = user_id.map(|id| open_task.time_spent_by(id)).unwrap_or(0);
        lock(&self.counter).elapsed = recorded;
        debug!(task_id = open_task.task.id, recorded, "Timer reset");
        true
    }

    /// Persist the elapsed time on the open task and return the task as
    /// re-fetched afterwards.
    ///
    /// Returns `Ok(None)` without any request while running or when the
    /// guard rejects the open task. The elapsed time is kept either way.
    /// A failed PUT is [`TimerError::Persistence`]; a failed re-fetch after
    /// a successful PUT is [`TimerError::Reload`].
    pub async fn save(
        &mut self,
        client: &ApiClient,
        open_task_id: i64,
    ) -> Result<Option<TaskDetail>, TimerError> {
        if self.is_running() || !self.guard_allows(open_task_id) {
            return Ok(None);
        }

        let elapsed = self.elapsed();
        if let Err(e) = client.save_timer(open_task_id, elapsed).await {
            warn!(task_id = open_task_id, elapsed, error = %e, "Failed to save timer");
            return Err(TimerError::Persistence(e));
        }
        info!(task_id = open_task_id, elapsed, "Timer saved");

        match client.fetch_task(open_task_id).await {
            Ok(task) => Ok(Some(task)),
            Err(e) => {
                warn!(task_id = open_task_id, error = %e, "Failed to reload task after save");
                Err(TimerError::Reload(e))
            }
        }
    }
}

impl Default for WorkTimer {
    fn default() -> Self {
        Self::new(GuardPolicy::default())
    }
}

impl Drop for WorkTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_ticker(counter: SharedCounter, run: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + TICK, TICK);
        loop {
            interval.tick().await;
            let mut state = lock(&counter);
            if state.run != run {
                break;
            }
            state.elapsed += 1;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::test_support::client_for;
    use mockito::{Matcher, Server};

    fn detail(task_id: i64, executors: serde_json::Value) -> TaskDetail {
        serde_json::from_value(serde_json::json!({
            "task": {"id": task_id, "name": "Task"},
            "executors": executors
        }))
        .unwrap()
    }

    async fn advance_secs_and_a_half(secs: u64) {
        time::sleep(Duration::from_millis(secs * 1000 + 500)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_requires_binding() {
        let mut timer = WorkTimer::default();
        assert!(!timer.start());
        assert!(!timer.is_running());
        assert_eq!(timer.task_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_schedules_one_ticker() {
        let mut timer = WorkTimer::default();
        timer.bind(1, "Task", 0);

        assert!(timer.start());
        assert!(!timer.start());
        advance_secs_and_a_half(2).await;

        assert_eq!(timer.elapsed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_start_resumes() {
        let mut timer = WorkTimer::default();
        timer.bind(1, "Task", 0);
        timer.start();
        advance_secs_and_a_half(2).await;

        assert!(timer.stop());
        assert!(!timer.stop());
        advance_secs_and_a_half(5).await;
        assert_eq!(timer.elapsed(), 2);

        assert!(timer.start());
        advance_secs_and_a_half(1).await;
        assert_eq!(timer.elapsed(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bind_ignored_while_running() {
        let mut timer = WorkTimer::default();
        timer.bind(1, "First", 10);
        timer.start();

        assert!(!timer.bind(2, "Second", 0));
        assert_eq!(timer.task_id(), Some(1));
        assert_eq!(timer.task_name(), Some("First"));
    }

    #[tokio::test]
    async fn test_reset_restores_recorded_time_for_user() {
        let mut timer = WorkTimer::default();
        timer.bind(5, "Task", 300);
        let open = detail(5, serde_json::json!([{"user_id": 1, "time_spent": 120}]));

        assert!(timer.reset(&open, Some(1)));
        assert_eq!(timer.elapsed(), 120);

        timer.bind(5, "Task", 300);
        assert!(timer.reset(&open, Some(2)));
        assert_eq!(timer.elapsed(), 0);
    }

    #[tokio::test]
    async fn test_reset_ignored_for_other_task() {
        let mut timer = WorkTimer::default();
        timer.bind(5, "Task", 300);
        let other = detail(6, serde_json::json!([{"user_id": 1, "time_spent": 120}]));

        assert!(!timer.reset(&other, Some(1)));
        assert_eq!(timer.elapsed(), 300);
    }

    #[tokio::test]
    async fn test_reset_unchecked_guard_accepts_other_task() {
        let mut timer = WorkTimer::new(GuardPolicy::Unchecked);
        timer.bind(5, "Task", 300);
        let other = detail(6, serde_json::json!([{"user_id": 1, "time_spent": 120}]));

        assert!(timer.reset(&other, Some(1)));
        assert_eq!(timer.elapsed(), 120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_ignored_while_running() {
        let mut timer = WorkTimer::default();
        timer.bind(5, "Task", 300);
        timer.start();
        let open = detail(5, serde_json::json!([]));

        assert!(!timer.reset(&open, Some(1)));
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_rejected_while_running() {
        // Nothing listens here; a request would fail the test
        let client = client_for("http://127.0.0.1:9", "token").await;
        let mut timer = WorkTimer::default();
        timer.bind(5, "Task", 10);
        timer.start();

        let saved = timer.save(&client, 5).await.unwrap();
        assert!(saved.is_none());
        assert!(timer.is_running());
    }

    #[tokio::test]
    async fn test_save_rejected_for_other_task() {
        let client = client_for("http://127.0.0.1:9", "token").await;
        let mut timer = WorkTimer::default();
        timer.bind(5, "Task", 10);

        assert!(timer.save(&client, 6).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_and_save_scenario() {
        let mut timer = WorkTimer::default();
        timer.bind(5, "Landing page", 10);
        timer.start();
        advance_secs_and_a_half(3).await;
        assert_eq!(timer.elapsed(), 13);
        timer.stop();

        // Real sockets from here on
        time::resume();
        let mut server = Server::new_async().await;
        let save = server
            .mock("PUT", "/scheduler/api/v1/task/5/save_timer")
            .match_body(Matcher::Json(serde_json::json!({"time_spent": 13})))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let refetch = server
            .mock("GET", "/scheduler/api/v1/task/5")
            .with_status(200)
            .with_body(
                r#"{"task": {"id": 5, "name": "Landing page"},
                    "executors": [{"user_id": 1, "time_spent": 13}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url(), "token").await;
        let task = timer.save(&client, 5).await.unwrap().expect("save should run");

        assert_eq!(task.time_spent_by(1), 13);
        save.assert_async().await;
        refetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_save_keeps_elapsed() {
        let mut server = Server::new_async().await;
        let _save = server
            .mock("PUT", "/scheduler/api/v1/task/5/save_timer")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        let refetch = server
            .mock("GET", "/scheduler/api/v1/task/5")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server.url(), "token").await;
        let mut timer = WorkTimer::default();
        timer.bind(5, "Task", 42);

        let err = timer.save(&client, 5).await.unwrap_err();
        assert!(matches!(err, TimerError::Persistence(ApiError::ServerError(_))));
        assert!(!err.is_saved());
        assert_eq!(timer.elapsed(), 42);
        refetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_reload_after_save_is_not_a_persistence_failure() {
        let mut server = Server::new_async().await;
        let save = server
            .mock("PUT", "/scheduler/api/v1/task/5/save_timer")
            .match_body(Matcher::Json(serde_json::json!({"time_spent": 42})))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let _refetch = server
            .mock("GET", "/scheduler/api/v1/task/5")
            .with_status(500)
            .with_body("down")
            .create_async()
            .await;

        let client = client_for(&server.url(), "token").await;
        let mut timer = WorkTimer::default();
        timer.bind(5, "Task", 42);

        let err = timer.save(&client, 5).await.unwrap_err();
        assert!(matches!(err, TimerError::Reload(ApiError::ServerError(ref body)) if body == "down"));
        assert!(err.is_saved());
        assert!(err.to_string().starts_with("Time saved"));
        assert_eq!(timer.elapsed(), 42);
        save.assert_async().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_from_a_stopped_run_does_not_count() {
        let counter: SharedCounter = Arc::new(Mutex::new(Counter {
            elapsed: 7,
            run: 0,
        }));
        let ticker = spawn_ticker(Arc::clone(&counter), 0);

        // Stopped without aborting: the ticker must notice on its own
        lock(&counter).run += 1;
        advance_secs_and_a_half(3).await;

        assert_eq!(lock(&counter).elapsed, 7);
        assert!(ticker.is_finished());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_tick_after_stop_on_multi_thread_runtime() {
        let mut timer = WorkTimer::default();
        timer.bind(1, "Task", 0);
        timer.start();
        time::sleep(Duration::from_millis(1_200)).await;

        timer.stop();
        let stopped_at = timer.elapsed();
        time::sleep(Duration::from_millis(1_500)).await;

        assert!(stopped_at >= 1);
        assert_eq!(timer.elapsed(), stopped_at);
    }
}
