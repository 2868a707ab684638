use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    dto::pipeline_dto::{
        CreateRejectionReasonPayload, CreateStagePayload, CustomizePipelinePayload,
        PipelineResponse, UpdateRejectionReasonPayload, UpdateStagePayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub include_inactive: Option<bool>,
}

fn actor_id(claims: &Claims) -> Result<i64> {
    claims
        .user_id()
        .ok_or_else(|| Error::Unauthorized("invalid_token".to_string()))
}

#[axum::debug_handler]
pub async fn get_pipeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let manager_id = actor_id(&claims)?;
    let stages = state.pipeline_service.resolve(manager_id).await?;
    let customized = state.pipeline_service.is_customized(manager_id).await?;
    Ok(Json(PipelineResponse { customized, stages }))
}

#[axum::debug_handler]
pub async fn customize_pipeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CustomizePipelinePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let manager_id = actor_id(&claims)?;
    let stages = state
        .pipeline_service
        .customize(manager_id, &payload.stage_ids)
        .await?;
    Ok(Json(PipelineResponse {
        customized: true,
        stages,
    }))
}

#[axum::debug_handler]
pub async fn reset_pipeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let manager_id = actor_id(&claims)?;
    state.pipeline_service.reset(manager_id).await?;
    let stages = state.pipeline_service.standard().await?;
    Ok(Json(PipelineResponse {
        customized: false,
        stages,
    }))
}

#[axum::debug_handler]
pub async fn list_stages(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse> {
    let stages = state
        .pipeline_service
        .list_stages(query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(stages))
}

#[axum::debug_handler]
pub async fn list_rejection_reasons(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse> {
    let reasons = state
        .pipeline_service
        .list_rejection_reasons(query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(reasons))
}

#[axum::debug_handler]
pub async fn create_stage(
    State(state): State<AppState>,
    Json(payload): Json<CreateStagePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let stage = state.pipeline_service.create_stage(payload).await?;
    Ok((StatusCode::CREATED, Json(stage)))
}

#[axum::debug_handler]
pub async fn update_stage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStagePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let stage = state.pipeline_service.update_stage(id, payload).await?;
    Ok(Json(stage))
}

#[axum::debug_handler]
pub async fn delete_stage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.pipeline_service.delete_stage(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn create_rejection_reason(
    State(state): State<AppState>,
    Json(payload): Json<CreateRejectionReasonPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let reason = state
        .pipeline_service
        .create_rejection_reason(payload)
        .await?;
    Ok((StatusCode::CREATED, Json(reason)))
}

#[axum::debug_handler]
pub async fn update_rejection_reason(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRejectionReasonPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let reason = state
        .pipeline_service
        .update_rejection_reason(id, payload)
        .await?;
    Ok(Json(reason))
}

#[axum::debug_handler]
pub async fn delete_rejection_reason(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.pipeline_service.delete_rejection_reason(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
