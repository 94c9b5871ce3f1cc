//! Async task monitor
//!
//! Providers acknowledge long-running mutations with a task handle. The
//! monitor polls that handle through a [`TaskSource`] until the task reaches
//! a terminal state, the ceiling elapses or the caller cancels the wait.
//!
//! Guarantees:
//! - a task that is already terminal is settled without any poll
//! - at most one poll is in flight per wait, and none is issued after the
//!   ceiling; an in-flight poll is bounded by the remaining budget
//! - cancelling the wait drops the in-flight poll and never touches the
//!   server-side task

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use stratus_common::{CloudError, Reference, Result, Task, TaskStatus};
use tokio::time::Instant;

/// Ceiling applied when an operation category declares none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

// Deadline used when `now + timeout` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Fetches the current state of a task.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn refresh(&self, task: &Reference) -> Result<Task>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Interval multiplier after each non-terminal poll; values below 1.0
    /// are treated as 1.0.
    pub backoff: f64,
    /// Overrides the category ceiling when set.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            backoff: 1.5,
            timeout: None,
        }
    }
}

impl PollPolicy {
    /// Grows `current` by the backoff factor, never beyond `max_interval`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let cap = self.max_interval.max(self.initial_interval);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff.max(1.0))
            .unwrap_or(cap)
            .min(cap)
    }
}

#[derive(Debug, Clone)]
pub struct TaskMonitor {
    policy: PollPolicy,
    ceiling: Duration,
}

impl Default for TaskMonitor {
    fn default() -> Self {
        Self::new(PollPolicy::default())
    }
}

impl TaskMonitor {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            ceiling: DEFAULT_TIMEOUT,
        }
    }

    /// Ceiling declared by the operation category this monitor serves.
    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Effective wall-clock budget for one wait.
    pub fn timeout(&self) -> Duration {
        self.policy.timeout.unwrap_or(self.ceiling)
    }

    pub async fn wait(&self, source: &dyn TaskSource, task: Task) -> Result<Task> {
        self.wait_with_cancel(source, task, std::future::pending())
            .await
    }

    /// Waits for `task` to settle, giving up with [`CloudError::Cancelled`]
    /// as soon as `cancel` resolves.
    pub async fn wait_with_cancel<F>(
        &self,
        source: &dyn TaskSource,
        task: Task,
        cancel: F,
    ) -> Result<Task>
    where
        F: Future<Output = ()>,
    {
        if task.is_terminal() {
            return settle(task);
        }

        let href = task.href().to_string();
        tokio::select! {
            biased;
            _ = cancel => {
                tracing::info!("Stopped waiting for task {}", href);
                Err(CloudError::Cancelled { task: href })
            }
            result = self.poll_until_terminal(source, task) => result,
        }
    }

    async fn poll_until_terminal(&self, source: &dyn TaskSource, task: Task) -> Result<Task> {
        let timeout = self.timeout();
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let reference = task.reference.clone();
        let mut current = task;
        let mut interval = self.policy.initial_interval;
        let mut polls: u32 = 0;

        loop {
            if current.is_terminal() {
                tracing::debug!(
                    "Task {} settled as {} after {} polls",
                    reference,
                    current.status,
                    polls
                );
                return settle(current);
            }

            if Instant::now() >= deadline {
                return Err(timed_out(&reference, timeout, current.status));
            }

            polls += 1;
            match tokio::time::timeout_at(deadline, source.refresh(&reference)).await {
                Err(_) => return Err(timed_out(&reference, timeout, current.status)),
                Ok(Ok(refreshed)) => {
                    tracing::debug!("Task {} poll {}: {}", reference, polls, refreshed.status);
                    if refreshed.status != current.status
                        && !current.status.can_transition_to(refreshed.status)
                    {
                        tracing::warn!(
                            "Task {} reported {} after {}",
                            reference,
                            refreshed.status,
                            current.status
                        );
                    }
                    current = refreshed;
                    if current.is_terminal() {
                        continue;
                    }
                }
                Ok(Err(e)) if e.is_transient() => {
                    tracing::warn!("Polling task {} failed, will retry: {}", reference, e);
                }
                Ok(Err(e)) => return Err(e),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(interval.min(remaining)).await;
            interval = self.policy.next_interval(interval);
        }
    }
}

// Only called with terminal tasks.
fn settle(task: Task) -> Result<Task> {
    if !task.status.is_failure() {
        return Ok(task);
    }
    Err(CloudError::TaskFailed {
        task: task.href().to_string(),
        status: task.status,
        detail: task.error,
    })
}

fn timed_out(reference: &Reference, timeout: Duration, last_status: TaskStatus) -> CloudError {
    tracing::warn!(
        "Task {} still {} after {:?}, giving up",
        reference,
        last_status,
        timeout
    );
    CloudError::TaskTimeout {
        task: reference.href.clone(),
        timeout,
        last_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use stratus_common::TaskError;

    const HREF: &str = "https://vcloud.example.com/api/task/42";

    /// Replays scripted poll results, then keeps reporting `then`.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Task>>>,
        then: TaskStatus,
        polls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Task>>, then: TaskStatus) -> Self {
            Self {
                script: Mutex::new(script.into()),
                then,
                polls: AtomicUsize::new(0),
            }
        }

        fn statuses(statuses: &[TaskStatus]) -> Self {
            let script = statuses.iter().map(|s| Ok(task(*s))).collect();
            let then = *statuses.last().unwrap_or(&TaskStatus::Running);
            Self::new(script, then)
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskSource for ScriptedSource {
        async fn refresh(&self, reference: &Reference) -> Result<Task> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Task::new(reference.clone(), self.then)))
        }
    }

    /// Never answers within any test's budget.
    struct StalledSource {
        polls: AtomicUsize,
    }

    #[async_trait]
    impl TaskSource for StalledSource {
        async fn refresh(&self, reference: &Reference) -> Result<Task> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Task::new(reference.clone(), TaskStatus::Running))
        }
    }

    fn task(status: TaskStatus) -> Task {
        Task::new(Reference::new(HREF), status)
    }

    fn fast_monitor(timeout: Duration) -> TaskMonitor {
        TaskMonitor::new(PollPolicy {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(20),
            backoff: 2.0,
            timeout: Some(timeout),
        })
    }

    #[tokio::test]
    async fn test_terminal_task_settles_without_polling() {
        let source = ScriptedSource::statuses(&[]);
        let monitor = fast_monitor(Duration::from_secs(1));

        let done = monitor
            .wait(&source, task(TaskStatus::Succeeded))
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Succeeded);

        let err = monitor
            .wait(&source, task(TaskStatus::Failed))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::TaskFailed { .. }));
        assert_eq!(source.polls(), 0);
    }

    #[tokio::test]
    async fn test_succeeds_after_exactly_four_polls() {
        let source = ScriptedSource::statuses(&[
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Running,
            TaskStatus::Succeeded,
        ]);
        let monitor = fast_monitor(Duration::from_secs(5));

        let done = monitor
            .wait(&source, task(TaskStatus::Queued))
            .await
            .unwrap();

        assert_eq!(done.status, TaskStatus::Succeeded);
        assert_eq!(source.polls(), 4);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.polls(), 4, "no polls after the terminal result");
    }

    #[tokio::test]
    async fn test_perpetual_running_times_out_and_stops_polling() {
        let source = ScriptedSource::statuses(&[TaskStatus::Running]);
        let monitor = fast_monitor(Duration::from_millis(80));

        let started = Instant::now();
        let err = monitor
            .wait(&source, task(TaskStatus::Running))
            .await
            .unwrap_err();

        match err {
            CloudError::TaskTimeout {
                task,
                timeout,
                last_status,
            } => {
                assert_eq!(task, HREF);
                assert_eq!(timeout, Duration::from_millis(80));
                assert_eq!(last_status, TaskStatus::Running);
            }
            other => panic!("expected TaskTimeout, got {:?}", other),
        }
        assert!(started.elapsed() >= Duration::from_millis(80));
        assert!(source.polls() >= 2);

        let polls_at_timeout = source.polls();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(source.polls(), polls_at_timeout);
    }

    #[tokio::test]
    async fn test_in_flight_poll_bounded_by_remaining_budget() {
        let source = StalledSource {
            polls: AtomicUsize::new(0),
        };
        let monitor = fast_monitor(Duration::from_millis(50));

        let started = Instant::now();
        let err = monitor
            .wait(&source, task(TaskStatus::Queued))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CloudError::TaskTimeout {
                last_status: TaskStatus::Queued,
                ..
            }
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(source.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_task_carries_provider_detail() {
        let mut failed = task(TaskStatus::Failed);
        failed.error = Some(TaskError {
            message: "Unable to delete media: in use".to_string(),
            major_error_code: Some(400),
            minor_error_code: Some("BAD_REQUEST".to_string()),
        });
        let source = ScriptedSource::new(
            vec![Ok(task(TaskStatus::Running)), Ok(failed)],
            TaskStatus::Failed,
        );

        let err = fast_monitor(Duration::from_secs(5))
            .wait(&source, task(TaskStatus::Queued))
            .await
            .unwrap_err();

        match err {
            CloudError::TaskFailed {
                task,
                status,
                detail,
            } => {
                assert_eq!(task, HREF);
                assert_eq!(status, TaskStatus::Failed);
                let detail = detail.unwrap();
                assert_eq!(detail.message, "Unable to delete media: in use");
                assert_eq!(detail.major_error_code, Some(400));
            }
            other => panic!("expected TaskFailed, got {:?}", other),
        }
        assert_eq!(source.polls(), 2);
    }

    #[tokio::test]
    async fn test_server_side_cancel_is_failure() {
        let source = ScriptedSource::statuses(&[TaskStatus::Canceled]);

        let err = fast_monitor(Duration::from_secs(5))
            .wait(&source, task(TaskStatus::Running))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CloudError::TaskFailed {
                status: TaskStatus::Canceled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_out_of_order_status_is_followed() {
        let source = ScriptedSource::statuses(&[
            TaskStatus::Running,
            TaskStatus::Queued,
            TaskStatus::Succeeded,
        ]);

        let done = fast_monitor(Duration::from_secs(5))
            .wait(&source, task(TaskStatus::Queued))
            .await
            .unwrap();

        assert_eq!(done.status, TaskStatus::Succeeded);
        assert_eq!(source.polls(), 3);
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let source = ScriptedSource::new(
            vec![
                Err(CloudError::Transport("connection reset".to_string())),
                Ok(task(TaskStatus::Running)),
                Err(CloudError::Transport("timed out".to_string())),
                Ok(task(TaskStatus::Succeeded)),
            ],
            TaskStatus::Succeeded,
        );

        let done = fast_monitor(Duration::from_secs(5))
            .wait(&source, task(TaskStatus::Queued))
            .await
            .unwrap();

        assert_eq!(done.status, TaskStatus::Succeeded);
        assert_eq!(source.polls(), 4);
    }

    #[tokio::test]
    async fn test_non_transport_error_surfaces_immediately() {
        let source = ScriptedSource::new(
            vec![Err(CloudError::UnexpectedResponse {
                method: "GET".to_string(),
                url: HREF.to_string(),
                status: 403,
                body: "forbidden".to_string(),
            })],
            TaskStatus::Running,
        );

        let err = fast_monitor(Duration::from_secs(5))
            .wait(&source, task(TaskStatus::Running))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert_eq!(source.polls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_wait_mid_poll() {
        let source = StalledSource {
            polls: AtomicUsize::new(0),
        };
        let monitor = fast_monitor(Duration::from_secs(60));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(());
        });

        let started = Instant::now();
        let err = monitor
            .wait_with_cancel(&source, task(TaskStatus::Running), async {
                let _ = rx.await;
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Cancelled { ref task } if task == HREF));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(source.polls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_interval_grows_and_caps() {
        let policy = PollPolicy::default();
        let mut interval = policy.initial_interval;
        let mut seen = vec![interval];
        for _ in 0..6 {
            interval = policy.next_interval(interval);
            seen.push(interval);
        }

        assert_eq!(seen[1], Duration::from_millis(1500));
        assert_eq!(seen[2], Duration::from_millis(2250));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_huge_backoff_jumps_to_cap() {
        for backoff in [f64::INFINITY, 1e30, f64::MAX] {
            let policy = PollPolicy {
                backoff,
                ..PollPolicy::default()
            };
            assert_eq!(
                policy.next_interval(Duration::from_secs(1)),
                Duration::from_secs(5),
                "backoff {}",
                backoff
            );
        }
    }

    #[tokio::test]
    async fn test_infinite_backoff_still_polls_to_completion() {
        let source = ScriptedSource::statuses(&[
            TaskStatus::Running,
            TaskStatus::Running,
            TaskStatus::Succeeded,
        ]);
        let monitor = TaskMonitor::new(PollPolicy {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(10),
            backoff: f64::INFINITY,
            timeout: Some(Duration::from_secs(5)),
        });

        let done = monitor
            .wait(&source, task(TaskStatus::Queued))
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Succeeded);
        assert_eq!(source.polls(), 3);
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_waits_instead_of_panicking() {
        let source = ScriptedSource::statuses(&[TaskStatus::Running, TaskStatus::Succeeded]);
        for timeout in [Duration::from_secs(u64::MAX), Duration::MAX] {
            let monitor = TaskMonitor::new(PollPolicy {
                initial_interval: Duration::from_millis(5),
                max_interval: Duration::from_millis(10),
                backoff: 2.0,
                timeout: Some(timeout),
            });

            let done = monitor
                .wait(&source, task(TaskStatus::Running))
                .await
                .unwrap();
            assert_eq!(done.status, TaskStatus::Succeeded);
        }
    }

    #[test]
    fn test_backoff_below_one_never_shrinks() {
        let policy = PollPolicy {
            backoff: 0.5,
            ..PollPolicy::default()
        };
        assert_eq!(
            policy.next_interval(Duration::from_secs(2)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_timeout_override_and_category_ceiling() {
        let monitor = TaskMonitor::default().with_ceiling(Duration::from_secs(600));
        assert_eq!(monitor.timeout(), Duration::from_secs(600));
        assert_eq!(TaskMonitor::default().timeout(), DEFAULT_TIMEOUT);

        let overridden = TaskMonitor::new(PollPolicy {
            timeout: Some(Duration::from_secs(10)),
            ..PollPolicy::default()
        })
        .with_ceiling(Duration::from_secs(600));
        assert_eq!(overridden.timeout(), Duration::from_secs(10));
    }
}
