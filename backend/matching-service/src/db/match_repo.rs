use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{MatchStore, StoreResult};
use crate::models::{ScoredCandidate, WorkerMatch, DEFAULT_MATCH_STATUS};

pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn list_for_job(&self, job_id: Uuid) -> StoreResult<Vec<WorkerMatch>> {
        let matches = sqlx::query_as::<_, WorkerMatch>(
            r#"
            SELECT job_id, worker_id, match_score, total_cost, status, ai_reasoning, created_at
            FROM worker_matches
            WHERE job_id = $1
            ORDER BY match_score DESC, worker_id ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    async fn list_for_jobs(&self, job_ids: &[Uuid]) -> StoreResult<Vec<WorkerMatch>> {
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }

        let matches = sqlx::query_as::<_, WorkerMatch>(
            r#"
            SELECT job_id, worker_id, match_score, total_cost, status, ai_reasoning, created_at
            FROM worker_matches
            WHERE job_id = ANY($1)
            ORDER BY job_id, match_score DESC, worker_id ASC
            "#,
        )
        .bind(job_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    async fn upsert_matches(
        &self,
        job_id: Uuid,
        candidates: &[ScoredCandidate],
    ) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;

        for candidate in candidates {
            sqlx::query(
                r#"
                INSERT INTO worker_matches (job_id, worker_id, match_score, total_cost,
                                            status, ai_reasoning)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (job_id, worker_id) DO UPDATE
                SET match_score = EXCLUDED.match_score,
                    total_cost = EXCLUDED.total_cost,
                    status = EXCLUDED.status,
                    ai_reasoning = EXCLUDED.ai_reasoning,
                    updated_at = NOW()
                "#,
            )
            .bind(job_id)
            .bind(candidate.worker_id)
            .bind(candidate.match_score)
            .bind(candidate.total_cost)
            .bind(candidate.status.as_deref().unwrap_or(DEFAULT_MATCH_STATUS))
            .bind(&candidate.ai_reasoning)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(candidates.len())
    }
}
