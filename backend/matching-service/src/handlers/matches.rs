use actix_web::{web, HttpResponse};

use super::JobIdQuery;
use crate::error::Result;
use crate::state::AppState;

/// GET /matches?jobId=
///
/// No authentication at this layer. Unscored jobs return an empty list.
pub async fn get_matches(
    state: web::Data<AppState>,
    query: web::Query<JobIdQuery>,
) -> Result<HttpResponse> {
    let job_id = query.parse()?;
    let matches = state.matches.list_matches(job_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "matches": matches })))
}
