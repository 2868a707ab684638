use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::candidate_dto::{
        CandidateListQuery, CandidateListResponse, HrCommentPayload, MoveStagePayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    models::Candidate,
    AppState,
};

/// Managers see their own candidates; admins see everyone's.
fn ensure_visible(claims: &Claims, candidate: &Candidate) -> Result<i64> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| Error::Unauthorized("invalid_token".to_string()))?;
    if claims.role_name() != "admin" && candidate.owning_manager_id != user_id {
        return Err(Error::Forbidden(
            "Candidate belongs to another manager".to_string(),
        ));
    }
    Ok(user_id)
}

fn request_meta(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    (ip, user_agent)
}

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<CandidateListQuery>,
) -> Result<impl IntoResponse> {
    let user_id = claims
        .user_id()
        .ok_or_else(|| Error::Unauthorized("invalid_token".to_string()))?;
    let manager_id = if claims.role_name() == "admin" {
        None
    } else {
        Some(user_id)
    };
    let result = state.candidate_service.list(manager_id, query).await?;
    Ok(Json(CandidateListResponse::from(result)))
}

#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get(id).await?;
    ensure_visible(&claims, &candidate)?;
    let detail = state.candidate_service.to_detail(candidate)?;
    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn move_candidate_stage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<MoveStagePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor_id = claims
        .user_id()
        .ok_or_else(|| Error::Unauthorized("invalid_token".to_string()))?;
    let (ip, user_agent) = request_meta(&headers);
    let candidate = state
        .candidate_service
        .move_to_stage(
            &state.pipeline_service,
            actor_id,
            &claims.role_name(),
            id,
            payload,
            ip,
            user_agent,
        )
        .await?;
    let detail = state.candidate_service.to_detail(candidate)?;
    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn update_hr_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<HrCommentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate = state.candidate_service.get(id).await?;
    ensure_visible(&claims, &candidate)?;
    let updated = state
        .candidate_service
        .update_hr_comment(id, &payload.comment)
        .await?;
    let detail = state.candidate_service.to_detail(updated)?;
    Ok(Json(detail))
}

#[axum::debug_handler]
pub async fn reprocess_resume(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get(id).await?;
    ensure_visible(&claims, &candidate)?;
    if candidate.resume_path.is_none() {
        return Err(Error::BadRequest(
            "Candidate has no resume file".to_string(),
        ));
    }
    let job = state.ingest_service.enqueue(id).await?;
    tracing::info!("Resume reprocess queued for candidate {} as job {}", id, job.id);
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[axum::debug_handler]
pub async fn get_ingest_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get(id).await?;
    ensure_visible(&claims, &candidate)?;
    let job = state.ingest_service.latest_for_candidate(id).await?;
    Ok(Json(job))
}

#[axum::debug_handler]
pub async fn list_candidate_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get(id).await?;
    ensure_visible(&claims, &candidate)?;
    let notifications = state.notification_service.list_for_candidate(id).await?;
    Ok(Json(notifications))
}

#[axum::debug_handler]
pub async fn list_candidate_audit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let candidate = state.candidate_service.get(id).await?;
    ensure_visible(&claims, &candidate)?;
    let entries = state
        .audit_service
        .list_for_entity("candidate", id, 50)
        .await?;
    Ok(Json(entries))
}
