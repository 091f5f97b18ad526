/// Match scoring collaborator
///
/// The scoring algorithm itself runs in a separate scoring service. This
/// module only defines the invocation contract and an HTTP client that
/// fetches scored candidates and persists them keyed by (job, worker), so
/// scoring the same job twice replaces rows instead of duplicating them.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::db::{MatchStore, StoreError};
use crate::models::ScoredCandidate;

#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("Scoring request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Scoring service returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Scoring service returned non-finite score for worker {0}")]
    InvalidScore(Uuid),

    #[error("Failed to persist matches: {0}")]
    Store(#[from] StoreError),
}

/// Computes and persists ranked matches for one job; returns rows written.
///
/// Implementations must be idempotent per job id: the dispatch queue
/// delivers at least once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchScorer: Send + Sync {
    async fn score_job(&self, job_id: Uuid) -> Result<usize, ScorerError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreRequest {
    job_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    #[serde(default)]
    matches: Vec<ScoredCandidate>,
}

pub struct HttpMatchScorer {
    client: reqwest::Client,
    base_url: String,
    matches: Arc<dyn MatchStore>,
}

impl HttpMatchScorer {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        matches: Arc<dyn MatchStore>,
    ) -> Result<Self, ScorerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            matches,
        })
    }
}

#[async_trait]
impl MatchScorer for HttpMatchScorer {
    async fn score_job(&self, job_id: Uuid) -> Result<usize, ScorerError> {
        let response = self
            .client
            .post(format!("{}/score", self.base_url))
            .json(&ScoreRequest { job_id })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScorerError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let scored: ScoreResponse = response.json().await?;
        if let Some(bad) = scored.matches.iter().find(|c| !c.match_score.is_finite()) {
            return Err(ScorerError::InvalidScore(bad.worker_id));
        }

        let written = self.matches.upsert_matches(job_id, &scored.matches).await?;
        info!(job_id = %job_id, matches = written, "Job scored");

        Ok(written)
    }
}
