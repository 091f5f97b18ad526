use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{StoreError, StoreResult, WorkerStore};
use crate::models::{Coordinates, Worker};

pub struct PgWorkerStore {
    pool: PgPool,
}

impl PgWorkerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkerStore for PgWorkerStore {
    async fn find_missing_coordinates(&self) -> StoreResult<Vec<Worker>> {
        let workers = sqlx::query_as::<_, Worker>(
            r#"
            SELECT id, postcode, base_postcode, base_latitude, base_longitude
            FROM workers
            WHERE base_latitude IS NULL OR base_longitude IS NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = workers.len(), "Fetched workers missing coordinates");

        Ok(workers)
    }

    async fn save_location(
        &self,
        worker_id: Uuid,
        postcode: &str,
        coordinates: Coordinates,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE workers
            SET base_latitude = $2,
                base_longitude = $3,
                postcode = $4,
                base_postcode = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(worker_id)
        .bind(coordinates.latitude)
        .bind(coordinates.longitude)
        .bind(postcode)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(format!("worker {}", worker_id)));
        }

        Ok(())
    }
}
