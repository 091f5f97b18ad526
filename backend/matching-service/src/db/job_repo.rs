use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{dispatch_repo, JobStore, StoreResult};
use crate::models::{Job, NewJob};

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, client_id: Uuid, job: &NewJob) -> StoreResult<Job> {
        // Job row and dispatch task commit together, so a committed job
        // always has matching queued for it.
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (client_id, title, description, property_address, urgency,
                              preferred_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING id, client_id, title, description, property_address, urgency,
                      preferred_date, status, assigned_worker_id, created_at
            "#,
        )
        .bind(client_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.property_address)
        .bind(&job.urgency)
        .bind(job.preferred_date)
        .fetch_one(&mut *tx)
        .await?;

        let task = dispatch_repo::enqueue_in_tx(&mut tx, created.id).await?;

        tx.commit().await?;

        debug!(
            job_id = %created.id,
            task_id = %task.id,
            "Job and dispatch task committed"
        );

        Ok(created)
    }

    async fn list_jobs_for_client(&self, client_id: Uuid, limit: i64) -> StoreResult<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, client_id, title, description, property_address, urgency,
                   preferred_date, status, assigned_worker_id, created_at
            FROM jobs
            WHERE client_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }
}
