//! Bounded worker pool for bulk (symbol, period) downloads.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use market_etl_core::config::BatchConfig;
use market_etl_core::error::FetchError;

/// One unit of bulk work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTask {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for BatchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}..{}", self.symbol, self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Completed { value: T, attempts: u32 },
    Failed { error: String, attempts: u32 },
    /// Exceeded the per-task timeout; not retried.
    TimedOut { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct BatchReport<T> {
    pub outcomes: Vec<(BatchTask, TaskOutcome<T>)>,
}

impl<T> BatchReport<T> {
    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Completed { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Failed { .. }))
    }

    #[must_use]
    pub fn timed_out(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::TimedOut { .. }))
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} tasks: {} completed, {} failed, {} timed out",
            self.outcomes.len(),
            self.completed(),
            self.failed(),
            self.timed_out()
        )
    }

    fn count(&self, pred: impl Fn(&TaskOutcome<T>) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

pub struct BatchFetcher {
    max_workers: usize,
    max_attempts: u32,
    retry_backoff: Duration,
    task_timeout: Duration,
}

impl BatchFetcher {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            max_workers: config.max_workers.max(1),
            max_attempts: config.max_retries.max(1),
            retry_backoff: Duration::from_secs(config.retry_backoff_secs),
            task_timeout: Duration::from_secs(config.task_timeout_secs),
        }
    }

    /// Runs `work` for every task with at most `max_workers` in flight and
    /// waits for all of them.
    ///
    /// A failing attempt is retried after the fixed backoff until
    /// `max_retries` attempts have been made. An attempt that exceeds the
    /// task timeout ends the task as [`TaskOutcome::TimedOut`].
    pub async fn run<T, F, Fut>(&self, tasks: Vec<BatchTask>, work: F) -> BatchReport<T>
    where
        F: Fn(BatchTask) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let total = tasks.len();
        let work = &work;
        let outcomes: Vec<(BatchTask, TaskOutcome<T>)> = stream::iter(tasks)
            .map(|task| async move {
                let outcome = self.run_task(&task, work).await;
                (task, outcome)
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        let report = BatchReport { outcomes };
        info!(total, "{}", report.summary());
        report
    }

    async fn run_task<T, F, Fut>(&self, task: &BatchTask, work: &F) -> TaskOutcome<T>
    where
        F: Fn(BatchTask) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match tokio::time::timeout(self.task_timeout, work(task.clone())).await {
                Ok(Ok(value)) => return TaskOutcome::Completed { value, attempts },
                Ok(Err(e)) if attempts < self.max_attempts => {
                    warn!(%task, attempts, "Attempt failed, retrying: {e}");
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Ok(Err(e)) => {
                    warn!(%task, attempts, "Giving up: {e}");
                    return TaskOutcome::Failed {
                        error: e.to_string(),
                        attempts,
                    };
                }
                Err(_) => {
                    warn!(%task, timeout = ?self.task_timeout, "Task timed out");
                    return TaskOutcome::TimedOut { attempts };
                }
            }
        }
    }
}
