use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::dispatcher::MatchDispatcher;
use crate::db::{JobStore, StoreResult};
use crate::models::{Job, NewJob};

/// Most recent jobs returned by the listing view
pub const JOB_LIST_LIMIT: i64 = 50;

pub struct JobService {
    jobs: Arc<dyn JobStore>,
    dispatcher: Arc<MatchDispatcher>,
}

impl JobService {
    pub fn new(jobs: Arc<dyn JobStore>, dispatcher: Arc<MatchDispatcher>) -> Self {
        Self { jobs, dispatcher }
    }

    /// Commit the job together with its dispatch task, then wake the
    /// dispatcher. Matching outcome never reaches the caller.
    pub async fn create_job(&self, client_id: Uuid, job: NewJob) -> StoreResult<Job> {
        let created = self.jobs.create_job(client_id, &job).await?;
        info!(job_id = %created.id, client_id = %client_id, "Job created");

        self.dispatcher.dispatch(created.id);

        Ok(created)
    }

    pub async fn list_jobs(&self, client_id: Uuid) -> StoreResult<Vec<Job>> {
        self.jobs.list_jobs_for_client(client_id, JOB_LIST_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::services::dispatcher::DispatchConfig;

    fn service(store: &Arc<InMemoryStore>) -> JobService {
        let dispatcher = Arc::new(MatchDispatcher::new(
            store.clone(),
            DispatchConfig::default(),
        ));
        JobService::new(store.clone(), dispatcher)
    }

    fn new_job(title: &str) -> NewJob {
        NewJob {
            title: title.into(),
            description: "Boiler pressure keeps dropping".into(),
            property_address: "221B Baker Street".into(),
            urgency: "medium".into(),
            preferred_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_job_queues_dispatch_task() {
        let store = Arc::new(InMemoryStore::new());
        let client_id = Uuid::new_v4();

        let job = service(&store)
            .create_job(client_id, new_job("Boiler service"))
            .await
            .unwrap();

        assert_eq!(job.client_id, client_id);
        assert_eq!(job.status, crate::models::JobStatus::Pending);

        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].job_id, job.id);
    }

    #[tokio::test]
    async fn test_failed_job_write_queues_nothing() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_job_writes(true);

        let result = service(&store)
            .create_job(Uuid::new_v4(), new_job("Boiler service"))
            .await;

        assert!(result.is_err());
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_list_jobs_only_returns_callers_jobs() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(&store);
        let alice = Uuid::new_v4();

        service.create_job(alice, new_job("Gutter")).await.unwrap();
        service.create_job(alice, new_job("Fence")).await.unwrap();
        service
            .create_job(Uuid::new_v4(), new_job("Roof"))
            .await
            .unwrap();

        let jobs = service.list_jobs(alice).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.client_id == alice));
    }
}
