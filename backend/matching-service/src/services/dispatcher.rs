/// Durable match dispatch
///
/// Job creation commits a `match_dispatch_queue` row in the job's own
/// transaction. `MatchDispatcher::dispatch` only wakes the background
/// `DispatchProcessor`, which drains the queue and calls the `MatchScorer`
/// for each task. Tasks are marked dispatched after scoring succeeds, so a
/// crash in between redelivers the task (at-least-once). Scoring is keyed
/// by (job, worker) which makes redelivery harmless.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::scorer::MatchScorer;
use crate::db::{DispatchQueue, StoreResult};
use crate::metrics::DispatchMetrics;
use crate::models::{DispatchStats, DispatchTask};

/// Upper bound for the delay between two attempts of one task.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Tasks claimed per cycle
    pub batch_size: i64,
    /// Idle wait when nobody wakes the processor
    pub poll_interval: Duration,
    /// Attempts before a task is left for operators
    pub max_attempts: i32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            poll_interval: Duration::from_secs(5),
            max_attempts: 5,
        }
    }
}

/// Delay before the next attempt of a task that has failed `attempts` times:
/// 2^attempts seconds, capped at `MAX_RETRY_BACKOFF`.
pub fn retry_backoff(attempts: i32) -> Duration {
    let exponent = u32::try_from(attempts.clamp(0, 16)).unwrap_or(0);
    Duration::from_secs(2u64.pow(exponent)).min(MAX_RETRY_BACKOFF)
}

pub struct MatchDispatcher {
    queue: Arc<dyn DispatchQueue>,
    wake: Arc<Notify>,
    config: DispatchConfig,
    metrics: Option<DispatchMetrics>,
}

impl MatchDispatcher {
    pub fn new(queue: Arc<dyn DispatchQueue>, config: DispatchConfig) -> Self {
        Self {
            queue,
            wake: Arc::new(Notify::new()),
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: DispatchMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Signal that a committed task is waiting for `job_id`.
    ///
    /// Never blocks and never fails: the task is already durable, so a lost
    /// wake-up only delays delivery until the next poll.
    pub fn dispatch(&self, job_id: Uuid) {
        debug!(job_id = %job_id, "Match dispatch requested");
        self.wake.notify_one();
    }

    /// Queue a fresh task for a job whose matching was lost or exhausted.
    pub async fn redispatch(&self, job_id: Uuid) -> StoreResult<DispatchTask> {
        let task = self.queue.enqueue(job_id).await?;
        info!(job_id = %job_id, task_id = %task.id, "Match dispatch replayed");
        self.wake.notify_one();
        Ok(task)
    }

    pub async fn stats(&self) -> StoreResult<DispatchStats> {
        self.queue.stats(self.config.max_attempts).await
    }

    /// Build the background processor sharing this dispatcher's queue and wake-up.
    pub fn processor(&self, scorer: Arc<dyn MatchScorer>) -> DispatchProcessor {
        DispatchProcessor {
            queue: self.queue.clone(),
            scorer,
            wake: self.wake.clone(),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

/// Outcome of one processor cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub claimed: usize,
    pub dispatched: usize,
    pub failed: usize,
}

pub struct DispatchProcessor {
    queue: Arc<dyn DispatchQueue>,
    scorer: Arc<dyn MatchScorer>,
    wake: Arc<Notify>,
    config: DispatchConfig,
    metrics: Option<DispatchMetrics>,
}

impl DispatchProcessor {
    /// Drain the queue until `shutdown` flips to true or its sender is dropped.
    ///
    /// Errors are logged and the loop carries on; shutdown is observed
    /// between batches only.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            batch_size = self.config.batch_size,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_attempts = self.config.max_attempts,
            "Match dispatch processor starting"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = match self.process_batch().await {
                Ok(report) => {
                    if report.claimed > 0 {
                        info!(
                            claimed = report.claimed,
                            dispatched = report.dispatched,
                            failed = report.failed,
                            "Processed match dispatch batch"
                        );
                    }
                    report
                }
                Err(e) => {
                    error!(error = %e, "Match dispatch batch failed");
                    BatchReport::default()
                }
            };

            self.refresh_metrics().await;

            // A full, fully settled batch means more may be due right now.
            // Anything left unsettled is still due, so wait before retrying it.
            let settled = report.dispatched + report.failed;
            let full = i64::try_from(report.claimed).unwrap_or(i64::MAX) >= self.config.batch_size;
            if report.claimed > 0 && full && settled == report.claimed {
                continue;
            }

            tokio::select! {
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Match dispatch processor stopped");
    }

    /// Claim due tasks and score their jobs one after another.
    pub async fn process_batch(&self) -> StoreResult<BatchReport> {
        let tasks = self
            .queue
            .fetch_due(self.config.batch_size, self.config.max_attempts)
            .await?;

        let mut report = BatchReport {
            claimed: tasks.len(),
            ..BatchReport::default()
        };

        for task in tasks {
            match self.scorer.score_job(task.job_id).await {
                Ok(matches) => {
                    if let Err(e) = self.queue.mark_dispatched(task.id).await {
                        error!(
                            task_id = %task.id,
                            job_id = %task.job_id,
                            error = %e,
                            "Job scored but task not marked dispatched; it will be redelivered"
                        );
                        continue;
                    }
                    report.dispatched += 1;
                    if let Some(metrics) = &self.metrics {
                        metrics.succeeded.inc();
                    }
                    debug!(job_id = %task.job_id, matches, "Match dispatch delivered");
                }
                Err(e) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.failed.inc();
                    }

                    let attempts = task.attempts.saturating_add(1);
                    let backoff = retry_backoff(attempts);
                    if attempts >= self.config.max_attempts {
                        warn!(
                            task_id = %task.id,
                            job_id = %task.job_id,
                            attempts,
                            error = %e,
                            "Match dispatch exhausted its attempts (requires manual replay)"
                        );
                    } else {
                        warn!(
                            task_id = %task.id,
                            job_id = %task.job_id,
                            attempts,
                            retry_in_secs = backoff.as_secs(),
                            error = %e,
                            "Match scoring failed, will retry"
                        );
                    }

                    if let Err(mark_err) = self
                        .queue
                        .mark_failed(task.id, &e.to_string(), backoff)
                        .await
                    {
                        error!(
                            task_id = %task.id,
                            error = %mark_err,
                            "Failed to record dispatch failure; task stays due"
                        );
                        continue;
                    }
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn refresh_metrics(&self) {
        if let Some(metrics) = &self.metrics {
            if let Ok(stats) = self.queue.stats(self.config.max_attempts).await {
                metrics.pending.set(stats.pending);
            }
        }
    }
}
