/// In-process implementation of every store trait
///
/// Used by unit and integration tests. All four stores share one lock so
/// job creation and its dispatch task stay atomic, mirroring the PostgreSQL
/// transaction. Failure switches let tests inject store errors.
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use super::{DispatchQueue, JobStore, MatchStore, StoreError, StoreResult, WorkerStore};
use crate::models::{
    Coordinates, DispatchStats, DispatchTask, Job, JobStatus, NewJob, ScoredCandidate, Worker,
    WorkerMatch, DEFAULT_MATCH_STATUS,
};

#[derive(Default)]
struct Tables {
    workers: BTreeMap<Uuid, Worker>,
    jobs: Vec<Job>,
    matches: BTreeMap<(Uuid, Uuid), WorkerMatch>,
    tasks: Vec<DispatchTask>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_job_writes: AtomicBool,
    fail_saves_for: Mutex<HashSet<Uuid>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means a test panicked mid-write.
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_reads(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read failure injected".into()));
        }
        Ok(())
    }

    pub fn insert_worker(&self, worker: Worker) {
        self.tables().workers.insert(worker.id, worker);
    }

    pub fn worker(&self, id: Uuid) -> Option<Worker> {
        self.tables().workers.get(&id).cloned()
    }

    pub fn insert_match(&self, row: WorkerMatch) {
        self.tables().matches.insert((row.job_id, row.worker_id), row);
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.tables().jobs.clone()
    }

    pub fn tasks(&self) -> Vec<DispatchTask> {
        self.tables().tasks.clone()
    }

    /// Make every read (worker scan, match reads, queue reads) fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_job_writes(&self, fail: bool) {
        self.fail_job_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `save_location` fail for one worker.
    pub fn fail_save_for(&self, worker_id: Uuid) {
        self.fail_saves_for
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(worker_id);
    }
}

#[async_trait]
impl WorkerStore for InMemoryStore {
    async fn find_missing_coordinates(&self) -> StoreResult<Vec<Worker>> {
        self.check_reads()?;
        Ok(self
            .tables()
            .workers
            .values()
            .filter(|w| w.needs_geocoding())
            .cloned()
            .collect())
    }

    async fn save_location(
        &self,
        worker_id: Uuid,
        postcode: &str,
        coordinates: Coordinates,
    ) -> StoreResult<()> {
        let injected = self
            .fail_saves_for
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&worker_id);
        if injected {
            return Err(StoreError::Unavailable("write failure injected".into()));
        }

        let mut tables = self.tables();
        let worker = tables
            .workers
            .get_mut(&worker_id)
            .ok_or_else(|| StoreError::Missing(format!("worker {}", worker_id)))?;

        worker.base_latitude = Some(coordinates.latitude);
        worker.base_longitude = Some(coordinates.longitude);
        worker.postcode = Some(postcode.to_string());
        worker.base_postcode = Some(postcode.to_string());

        Ok(())
    }
}

fn new_task(job_id: Uuid) -> DispatchTask {
    let now = Utc::now();
    DispatchTask {
        id: Uuid::new_v4(),
        job_id,
        attempts: 0,
        last_error: None,
        created_at: now,
        next_attempt_at: now,
        dispatched_at: None,
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn create_job(&self, client_id: Uuid, job: &NewJob) -> StoreResult<Job> {
        if self.fail_job_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failure injected".into()));
        }

        let created = Job {
            id: Uuid::new_v4(),
            client_id,
            title: job.title.clone(),
            description: job.description.clone(),
            property_address: job.property_address.clone(),
            urgency: job.urgency.clone(),
            preferred_date: job.preferred_date,
            status: JobStatus::Pending,
            assigned_worker_id: None,
            created_at: Utc::now(),
        };

        let mut tables = self.tables();
        tables.jobs.push(created.clone());
        tables.tasks.push(new_task(created.id));

        Ok(created)
    }

    async fn list_jobs_for_client(&self, client_id: Uuid, limit: i64) -> StoreResult<Vec<Job>> {
        self.check_reads()?;
        let mut jobs: Vec<Job> = self
            .tables()
            .jobs
            .iter()
            .filter(|j| j.client_id == client_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(jobs)
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn list_for_job(&self, job_id: Uuid) -> StoreResult<Vec<WorkerMatch>> {
        self.list_for_jobs(&[job_id]).await
    }

    async fn list_for_jobs(&self, job_ids: &[Uuid]) -> StoreResult<Vec<WorkerMatch>> {
        self.check_reads()?;
        // Key order (job, worker); ranking is the reader's job.
        Ok(self
            .tables()
            .matches
            .values()
            .filter(|m| job_ids.contains(&m.job_id))
            .cloned()
            .collect())
    }

    async fn upsert_matches(
        &self,
        job_id: Uuid,
        candidates: &[ScoredCandidate],
    ) -> StoreResult<usize> {
        let mut tables = self.tables();
        for candidate in candidates {
            let key = (job_id, candidate.worker_id);
            let created_at = tables
                .matches
                .get(&key)
                .map(|existing| existing.created_at)
                .unwrap_or_else(Utc::now);

            tables.matches.insert(
                key,
                WorkerMatch {
                    job_id,
                    worker_id: candidate.worker_id,
                    match_score: candidate.match_score,
                    total_cost: candidate.total_cost,
                    status: candidate
                        .status
                        .clone()
                        .unwrap_or_else(|| DEFAULT_MATCH_STATUS.to_string()),
                    ai_reasoning: candidate.ai_reasoning.clone(),
                    created_at,
                },
            );
        }
        Ok(candidates.len())
    }
}

#[async_trait]
impl DispatchQueue for InMemoryStore {
    async fn enqueue(&self, job_id: Uuid) -> StoreResult<DispatchTask> {
        let task = new_task(job_id);
        self.tables().tasks.push(task.clone());
        Ok(task)
    }

    async fn fetch_due(&self, limit: i64, max_attempts: i32) -> StoreResult<Vec<DispatchTask>> {
        self.check_reads()?;
        let now = Utc::now();
        Ok(self
            .tables()
            .tasks
            .iter()
            .filter(|t| {
                t.dispatched_at.is_none() && t.attempts < max_attempts && t.next_attempt_at <= now
            })
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn mark_dispatched(&self, task_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables();
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| StoreError::Missing(format!("dispatch task {}", task_id)))?;
        task.dispatched_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_failed(
        &self,
        task_id: Uuid,
        error: &str,
        retry_after: Duration,
    ) -> StoreResult<()> {
        let mut tables = self.tables();
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| StoreError::Missing(format!("dispatch task {}", task_id)))?;
        task.attempts += 1;
        task.last_error = Some(error.to_string());
        task.next_attempt_at = Utc::now()
            + chrono::Duration::from_std(retry_after).unwrap_or_else(|_| chrono::Duration::zero());
        Ok(())
    }

    async fn stats(&self, max_attempts: i32) -> StoreResult<DispatchStats> {
        self.check_reads()?;
        let now = Utc::now();
        let tables = self.tables();
        let undispatched = tables.tasks.iter().filter(|t| t.dispatched_at.is_none());

        let mut stats = DispatchStats::default();
        for task in undispatched {
            if task.attempts < max_attempts {
                stats.pending += 1;
                let age = (now - task.created_at).num_seconds();
                stats.oldest_pending_age_seconds = stats.oldest_pending_age_seconds.max(age);
            } else {
                stats.exhausted += 1;
            }
        }
        Ok(stats)
    }
}
