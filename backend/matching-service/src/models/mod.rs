/// Data models for matching-service
///
/// - Worker: tradesperson with a home base that may still need geocoding
/// - Job: property-maintenance task posted by a client
/// - WorkerMatch: scored pairing of a job with a candidate worker
/// - DispatchTask: durable request to compute matches for a job
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Latitude/longitude pair in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Worker {
    pub id: Uuid,
    pub postcode: Option<String>,
    pub base_postcode: Option<String>,
    pub base_latitude: Option<f64>,
    pub base_longitude: Option<f64>,
}

impl Worker {
    /// Postcode used for geocoding: `base_postcode` wins over `postcode`,
    /// blank values count as absent.
    pub fn effective_postcode(&self) -> Option<&str> {
        non_blank(self.base_postcode.as_deref()).or_else(|| non_blank(self.postcode.as_deref()))
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.base_latitude, self.base_longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    pub fn needs_geocoding(&self) -> bool {
        self.base_latitude.is_none() || self.base_longitude.is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: String,
    pub property_address: String,
    pub urgency: String,
    pub preferred_date: Option<NaiveDate>,
    pub status: JobStatus,
    pub assigned_worker_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for job creation
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub property_address: String,
    pub urgency: String,
    pub preferred_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkerMatch {
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub match_score: f64,
    pub total_cost: f64,
    pub status: String,
    pub ai_reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Status given to match rows when the scorer does not provide one
pub const DEFAULT_MATCH_STATUS: &str = "suggested";

/// One scored worker as produced by the match scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub worker_id: Uuid,
    pub match_score: f64,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ai_reasoning: Option<String>,
}

/// Durable request to compute matches for a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DispatchTask {
    pub id: Uuid,
    pub job_id: Uuid,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub next_attempt_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// Snapshot of the dispatch queue backlog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    /// Undispatched tasks still eligible for delivery
    pub pending: i64,
    /// Undispatched tasks that ran out of attempts
    pub exhausted: i64,
    pub oldest_pending_age_seconds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(postcode: Option<&str>, base_postcode: Option<&str>) -> Worker {
        Worker {
            id: Uuid::new_v4(),
            postcode: postcode.map(String::from),
            base_postcode: base_postcode.map(String::from),
            base_latitude: None,
            base_longitude: None,
        }
    }

    #[test]
    fn test_effective_postcode_prefers_base() {
        let w = worker(Some("EC1A 1BB"), Some("SW1A 1AA"));
        assert_eq!(w.effective_postcode(), Some("SW1A 1AA"));
    }

    #[test]
    fn test_effective_postcode_falls_back_on_blank_base() {
        let w = worker(Some(" EC1A 1BB "), Some("   "));
        assert_eq!(w.effective_postcode(), Some("EC1A 1BB"));

        let w = worker(Some(""), None);
        assert_eq!(w.effective_postcode(), None);
    }

    #[test]
    fn test_half_pair_needs_geocoding() {
        let mut w = worker(Some("SW1A 1AA"), None);
        w.base_latitude = Some(51.5);
        assert!(w.needs_geocoding());
        assert_eq!(w.coordinates(), None);

        w.base_longitude = Some(-0.14);
        assert!(!w.needs_geocoding());
    }

    #[test]
    fn test_job_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
