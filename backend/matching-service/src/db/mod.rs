/// Persistence layer for matching-service
///
/// Each store is a trait so services can run against PostgreSQL in
/// production and against `memory::InMemoryStore` in tests.
///
/// - `worker_repo`: worker coordinates (written only by the reconciler)
/// - `job_repo`: job rows, created together with their dispatch task
/// - `match_repo`: scored worker matches, upserted per (job, worker)
/// - `dispatch_repo`: durable match-dispatch queue
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::models::{
    Coordinates, DispatchStats, DispatchTask, Job, NewJob, ScoredCandidate, Worker, WorkerMatch,
};

pub mod dispatch_repo;
pub mod job_repo;
pub mod match_repo;
pub mod memory;
pub mod worker_repo;

pub use dispatch_repo::PgDispatchQueue;
pub use job_repo::PgJobStore;
pub use match_repo::PgMatchStore;
pub use memory::InMemoryStore;
pub use worker_repo::PgWorkerStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    Missing(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait WorkerStore: Send + Sync {
    /// Workers with at least one coordinate missing, ordered by id.
    async fn find_missing_coordinates(&self) -> StoreResult<Vec<Worker>>;

    /// Persist resolved coordinates and set both postcode fields to `postcode`.
    async fn save_location(
        &self,
        worker_id: Uuid,
        postcode: &str,
        coordinates: Coordinates,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a pending job and its match-dispatch task atomically.
    async fn create_job(&self, client_id: Uuid, job: &NewJob) -> StoreResult<Job>;

    /// Newest first.
    async fn list_jobs_for_client(&self, client_id: Uuid, limit: i64) -> StoreResult<Vec<Job>>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn list_for_job(&self, job_id: Uuid) -> StoreResult<Vec<WorkerMatch>>;

    async fn list_for_jobs(&self, job_ids: &[Uuid]) -> StoreResult<Vec<WorkerMatch>>;

    /// Insert or replace rows keyed by (job_id, worker_id). Returns rows written.
    async fn upsert_matches(
        &self,
        job_id: Uuid,
        candidates: &[ScoredCandidate],
    ) -> StoreResult<usize>;
}

#[async_trait]
pub trait DispatchQueue: Send + Sync {
    async fn enqueue(&self, job_id: Uuid) -> StoreResult<DispatchTask>;

    /// Undispatched tasks with `attempts < max_attempts` whose retry time has
    /// passed, oldest first.
    async fn fetch_due(&self, limit: i64, max_attempts: i32) -> StoreResult<Vec<DispatchTask>>;

    async fn mark_dispatched(&self, task_id: Uuid) -> StoreResult<()>;

    /// Record a failed attempt and push the next attempt `retry_after` out.
    async fn mark_failed(
        &self,
        task_id: Uuid,
        error: &str,
        retry_after: Duration,
    ) -> StoreResult<()>;

    async fn stats(&self, max_attempts: i32) -> StoreResult<DispatchStats>;
}
