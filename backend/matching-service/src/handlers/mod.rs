/// HTTP handlers for matching-service
///
/// - `admin`: geocoding backfill and dispatch queue operations (admin only)
/// - `jobs`: job creation and the bulk job-listing view
/// - `matches`: ranked matches for one job
/// - `health`: liveness and readiness probes
use actix_web::web;
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics::metrics_handler;

pub mod admin;
pub mod health;
pub mod jobs;
pub mod matches;

/// Register every route except `/ready`, which needs the database pool.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(64 * 1024)
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .route("/health", web::get().to(health::health))
    .route("/metrics", web::get().to(metrics_handler))
    .route("/admin/geocode-workers", web::post().to(admin::geocode_workers))
    .route("/admin/dispatch/stats", web::get().to(admin::dispatch_stats))
    .route("/admin/dispatch/replay", web::post().to(admin::replay_dispatch))
    .route("/jobs/bulk", web::post().to(jobs::create_job_bulk))
    .route("/jobs", web::get().to(jobs::list_jobs))
    .route("/matches", web::get().to(matches::get_matches));
}

/// Query string carrying a job id, e.g. `?jobId=...`
#[derive(Debug, serde::Deserialize)]
pub struct JobIdQuery {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

impl JobIdQuery {
    pub fn parse(&self) -> Result<Uuid, AppError> {
        let raw = self
            .job_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation("jobId is required".into()))?;

        Uuid::parse_str(raw).map_err(|_| AppError::Validation("jobId must be a valid UUID".into()))
    }
}
