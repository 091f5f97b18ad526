/// PostgreSQL-backed match-dispatch queue
///
/// Rows are written in the same transaction as the job they refer to and
/// drained by `DispatchProcessor`. A row is delivered until it is marked
/// dispatched or runs out of attempts, so delivery is at-least-once.
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DispatchQueue, StoreError, StoreResult};
use crate::models::{DispatchStats, DispatchTask};

pub struct PgDispatchQueue {
    pool: PgPool,
}

impl PgDispatchQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Queue matching for `job_id` inside the caller's transaction.
pub(crate) async fn enqueue_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
) -> StoreResult<DispatchTask> {
    let task = sqlx::query_as::<_, DispatchTask>(
        r#"
        INSERT INTO match_dispatch_queue (id, job_id)
        VALUES ($1, $2)
        RETURNING id, job_id, attempts, last_error, created_at, next_attempt_at, dispatched_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(task)
}

#[async_trait]
impl DispatchQueue for PgDispatchQueue {
    async fn enqueue(&self, job_id: Uuid) -> StoreResult<DispatchTask> {
        let mut tx = self.pool.begin().await?;
        let task = enqueue_in_tx(&mut tx, job_id).await?;
        tx.commit().await?;

        debug!(task_id = %task.id, job_id = %job_id, "Dispatch task enqueued");

        Ok(task)
    }

    async fn fetch_due(&self, limit: i64, max_attempts: i32) -> StoreResult<Vec<DispatchTask>> {
        let tasks = sqlx::query_as::<_, DispatchTask>(
            r#"
            SELECT id, job_id, attempts, last_error, created_at, next_attempt_at, dispatched_at
            FROM match_dispatch_queue
            WHERE dispatched_at IS NULL
              AND attempts < $2
              AND next_attempt_at <= NOW()
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn mark_dispatched(&self, task_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE match_dispatch_queue
            SET dispatched_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(task_id = %task_id, "Dispatch task not found when marking as dispatched");
            return Err(StoreError::Missing(format!("dispatch task {}", task_id)));
        }

        Ok(())
    }

    async fn mark_failed(
        &self,
        task_id: Uuid,
        error: &str,
        retry_after: Duration,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE match_dispatch_queue
            SET attempts = attempts + 1,
                last_error = $2,
                next_attempt_at = NOW() + ($3 * INTERVAL '1 second')
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .bind(error)
        .bind(retry_after.as_secs_f64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(task_id = %task_id, "Dispatch task not found when marking as failed");
            return Err(StoreError::Missing(format!("dispatch task {}", task_id)));
        }

        Ok(())
    }

    async fn stats(&self, max_attempts: i32) -> StoreResult<DispatchStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE attempts < $1)::BIGINT AS pending,
                COUNT(*) FILTER (WHERE attempts >= $1)::BIGINT AS exhausted,
                COALESCE(
                    EXTRACT(EPOCH FROM (NOW() - MIN(created_at) FILTER (WHERE attempts < $1))),
                    0
                )::BIGINT AS oldest_age_seconds
            FROM match_dispatch_queue
            WHERE dispatched_at IS NULL
            "#,
        )
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;

        Ok(DispatchStats {
            pending: row.try_get("pending")?,
            exhausted: row.try_get("exhausted")?,
            oldest_pending_age_seconds: row.try_get("oldest_age_seconds")?,
        })
    }
}
