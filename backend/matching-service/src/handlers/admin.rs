use actix_web::{web, HttpResponse};
use serde::Serialize;
use tracing::info;

use super::JobIdQuery;
use crate::error::Result;
use crate::middleware::{require_admin, AuthenticatedUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GeocodeResponse {
    pub message: String,
    pub updated: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

/// POST /admin/geocode-workers
pub async fn geocode_workers(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let grant = require_admin(&user)?;
    info!(admin_id = %grant.admin_id(), "Worker geocoding requested");

    let summary = state.reconciler.reconcile().await?;

    Ok(HttpResponse::Ok().json(GeocodeResponse {
        message: format!(
            "Geocoding complete: {} updated, {} failed",
            summary.updated, summary.failed
        ),
        updated: summary.updated,
        failed: summary.failed,
        errors: summary.errors,
    }))
}

/// GET /admin/dispatch/stats
pub async fn dispatch_stats(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&user)?;

    let stats = state.dispatcher.stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// POST /admin/dispatch/replay?jobId=
pub async fn replay_dispatch(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<JobIdQuery>,
) -> Result<HttpResponse> {
    let grant = require_admin(&user)?;
    let job_id = query.parse()?;

    let task = state.dispatcher.redispatch(job_id).await?;
    info!(admin_id = %grant.admin_id(), job_id = %job_id, "Dispatch replay queued");

    Ok(HttpResponse::Accepted().json(serde_json::json!({ "task": task })))
}
