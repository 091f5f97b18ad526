use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::{Job, NewJob, WorkerMatch};
use crate::services::matches::DEFAULT_MATCHES_PER_JOB;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub job: JobInput,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "description is required"))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 500, message = "propertyAddress is required"))]
    #[serde(default)]
    pub property_address: String,
    #[validate(length(min = 1, max = 50, message = "urgency is required"))]
    #[serde(default)]
    pub urgency: String,
    /// `YYYY-MM-DD`; blank means no preference
    #[serde(default)]
    pub preferred_date: Option<String>,
}

impl JobInput {
    /// Trim, validate and convert into a storable job.
    pub fn into_new_job(self) -> Result<NewJob> {
        let input = JobInput {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            property_address: self.property_address.trim().to_string(),
            urgency: self.urgency.trim().to_string(),
            preferred_date: self
                .preferred_date
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        };
        input.validate()?;

        let preferred_date = input
            .preferred_date
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .transpose()
            .map_err(|_| AppError::Validation("preferredDate must be YYYY-MM-DD".into()))?;

        Ok(NewJob {
            title: input.title,
            description: input.description,
            property_address: input.property_address,
            urgency: input.urgency,
            preferred_date,
        })
    }
}

/// POST /jobs/bulk
///
/// Responds as soon as the job and its dispatch task are committed; the
/// match computation runs in the background and cannot change this response.
pub async fn create_job_bulk(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<CreateJobRequest>,
) -> Result<HttpResponse> {
    let new_job = body.into_inner().job.into_new_job()?;
    let job = state.jobs.create_job(user.user_id, new_job).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "job": job })))
}

#[derive(Debug, Serialize)]
pub struct JobWithMatches {
    #[serde(flatten)]
    pub job: Job,
    pub matches: Vec<WorkerMatch>,
}

/// GET /jobs
pub async fn list_jobs(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let jobs = state.jobs.list_jobs(user.user_id).await?;
    let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();
    let mut top = state
        .matches
        .list_matches_for_jobs(&ids, DEFAULT_MATCHES_PER_JOB)
        .await?;

    let jobs: Vec<JobWithMatches> = jobs
        .into_iter()
        .map(|job| JobWithMatches {
            matches: top.remove(&job.id).unwrap_or_default(),
            job,
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "jobs": jobs })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, preferred_date: Option<&str>) -> JobInput {
        JobInput {
            title: title.into(),
            description: "Replace cracked tiles".into(),
            property_address: "1 Example Road".into(),
            urgency: "low".into(),
            preferred_date: preferred_date.map(String::from),
        }
    }

    #[test]
    fn test_into_new_job_trims_and_parses_date() {
        let job = input("  Bathroom tiles ", Some("2024-06-01"))
            .into_new_job()
            .unwrap();

        assert_eq!(job.title, "Bathroom tiles");
        assert_eq!(job.preferred_date, NaiveDate::from_ymd_opt(2024, 6, 1));
    }

    #[test]
    fn test_blank_date_means_no_preference() {
        let job = input("Tiles", Some("  ")).into_new_job().unwrap();
        assert_eq!(job.preferred_date, None);
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        assert!(matches!(
            input("   ", None).into_new_job(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            input("Tiles", Some("01/06/2024")).into_new_job(),
            Err(AppError::Validation(_))
        ));
    }
}
