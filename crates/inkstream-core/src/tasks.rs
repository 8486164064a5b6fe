//! Background task queue
//!
//! At-least-once execution for fire-and-forget work (free-nuke cleanup,
//! audit writes). Each task is retried on the shared backoff schedule; a
//! task that exhausts its attempts is reported on an observable failure
//! channel and the operator alert bus instead of disappearing into a log
//! line.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::alert::{AlertBus, Severity};
use crate::backoff::BackoffPolicy;

type BoxFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
type TaskOp = Box<dyn FnMut() -> BoxFuture + Send>;

struct QueuedTask {
    name: String,
    op: TaskOp,
}

/// Report for a task that exhausted its retry budget.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    /// Task name as submitted
    pub task: String,
    /// Attempts made before giving up
    pub attempts: u32,
    /// Last error observed
    pub error: String,
}

/// Handle for submitting background tasks and observing their failures.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<QueuedTask>,
    failures: broadcast::Sender<TaskFailure>,
}

impl TaskQueue {
    /// Spawn the worker and return the queue handle plus its join handle.
    ///
    /// `max_attempts` bounds retries per task; delays between attempts
    /// follow `policy`. Exhausted tasks are published on the failure
    /// channel and as a [`Severity::Critical`] alert on `alerts`.
    #[must_use]
    pub fn spawn(
        policy: BackoffPolicy,
        max_attempts: u32,
        alerts: AlertBus,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<QueuedTask>(256);
        let (failures, _) = broadcast::channel(64);
        let failures_tx = failures.clone();

        let worker = tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                run_task(task, policy, max_attempts, &failures_tx, &alerts).await;
            }
        });

        (Self { tx, failures }, worker)
    }

    /// Submit a task. The closure is invoked once per attempt.
    pub async fn submit<F, Fut>(&self, name: impl Into<String>, mut op: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let task = QueuedTask {
            name: name.into(),
            op: Box::new(move || Box::pin(op()) as BoxFuture),
        };
        self.tx.send(task).await.is_ok()
    }

    /// Subscribe to exhausted-task reports.
    #[must_use]
    pub fn failures(&self) -> broadcast::Receiver<TaskFailure> {
        self.failures.subscribe()
    }
}

async fn run_task(
    mut task: QueuedTask,
    policy: BackoffPolicy,
    max_attempts: u32,
    failures: &broadcast::Sender<TaskFailure>,
    alerts: &AlertBus,
) {
    let mut last_error = String::new();
    for attempt in 1..=max_attempts.max(1) {
        match (task.op)().await {
            Ok(()) => {
                if attempt > 1 {
                    debug!(task = %task.name, attempt, "background task succeeded after retry");
                }
                return;
            }
            Err(e) => {
                last_error = e;
                if attempt < max_attempts {
                    let delay = policy.delay(attempt);
                    warn!(
                        task = %task.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %last_error,
                        "background task failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    alerts.publish(
        Severity::Critical,
        "tasks",
        format!(
            "background task '{}' exhausted {} attempts: {}",
            task.name, max_attempts, last_error
        ),
    );
    let _ = failures.send(TaskFailure {
        task: task.name,
        attempts: max_attempts,
        error: last_error,
    });
}
