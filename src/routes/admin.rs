use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::admin_dto::{CreateUserPayload, LoginPayload, LoginResponse, UpdateUserPayload},
    error::{Error, Result},
    middleware::auth::{issue_token, Claims},
    AppState,
};

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
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .user_service
        .authenticate(&payload.email, &payload.password)
        .await?;
    let token = issue_token(user.id, &user.role)?;

    let (ip, user_agent) = request_meta(&headers);
    state
        .audit_service
        .log(Some(user.id), "login", "user", user.id, None, ip, user_agent)
        .await?;

    let user = state.user_service.to_response(user)?;
    Ok(Json(LoginResponse { token, user }))
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor_id = claims
        .user_id()
        .ok_or_else(|| Error::Unauthorized("invalid_token".to_string()))?;

    let user = state.user_service.create(payload).await?;

    let (ip, user_agent) = request_meta(&headers);
    state
        .audit_service
        .log(
            Some(actor_id),
            "user_created",
            "user",
            user.id,
            Some(serde_json::json!({ "role": user.role, "full_name": user.full_name })),
            ip,
            user_agent,
        )
        .await?;

    let response = state.user_service.to_response(user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let users = state.user_service.list().await?;
    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        responses.push(state.user_service.to_response(user)?);
    }
    Ok(Json(responses))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor_id = claims
        .user_id()
        .ok_or_else(|| Error::Unauthorized("invalid_token".to_string()))?;

    let changes = serde_json::json!({
        "role": payload.role,
        "is_active": payload.is_active,
    });
    let user = state.user_service.update(id, payload).await?;

    let (ip, user_agent) = request_meta(&headers);
    state
        .audit_service
        .log(
            Some(actor_id),
            "user_updated",
            "user",
            user.id,
            Some(changes),
            ip,
            user_agent,
        )
        .await?;

    let response = state.user_service.to_response(user)?;
    Ok(Json(response))
}
