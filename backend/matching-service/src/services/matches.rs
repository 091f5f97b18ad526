use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{MatchStore, StoreResult};
use crate::models::WorkerMatch;

/// Matches shown per job in the bulk job-listing view
pub const DEFAULT_MATCHES_PER_JOB: usize = 3;

/// Read-only access to scored matches, best first
pub struct MatchReader {
    store: Arc<dyn MatchStore>,
}

impl MatchReader {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self { store }
    }

    /// All matches for a job, ranked. An unscored job yields an empty list.
    pub async fn list_matches(&self, job_id: Uuid) -> StoreResult<Vec<WorkerMatch>> {
        let mut matches = self.store.list_for_job(job_id).await?;
        rank_matches(&mut matches);
        Ok(matches)
    }

    /// Top `per_job_limit` matches for each job. Every requested job has an
    /// entry, empty when it has no matches yet.
    pub async fn list_matches_for_jobs(
        &self,
        job_ids: &[Uuid],
        per_job_limit: usize,
    ) -> StoreResult<HashMap<Uuid, Vec<WorkerMatch>>> {
        let mut grouped: HashMap<Uuid, Vec<WorkerMatch>> =
            job_ids.iter().map(|id| (*id, Vec::new())).collect();
        if job_ids.is_empty() {
            return Ok(grouped);
        }

        for row in self.store.list_for_jobs(job_ids).await? {
            grouped.entry(row.job_id).or_default().push(row);
        }

        for matches in grouped.values_mut() {
            rank_matches(matches);
            matches.truncate(per_job_limit);
        }

        Ok(grouped)
    }
}

/// Highest `match_score` first; equal scores by ascending worker id.
pub fn rank_matches(matches: &mut [WorkerMatch]) {
    matches.sort_by(compare_rank);
}

fn compare_rank(a: &WorkerMatch, b: &WorkerMatch) -> Ordering {
    b.match_score
        .total_cmp(&a.match_score)
        .then_with(|| a.worker_id.cmp(&b.worker_id))
}
