use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::vacancy_dto::{
        CreateVacancyPayload, GenerateDescriptionPayload, GeneratedDescriptionResponse,
        UpdateVacancyPayload, VacancyListQuery, VacancyListResponse, VacancyResponse,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/hr/vacancies",
    request_body = CreateVacancyPayload,
    responses(
        (status = 201, description = "Vacancy created successfully", body = VacancyResponse),
        (status = 400, description = "Invalid payload or question list")
    )
)]
#[axum::debug_handler]
pub async fn create_vacancy(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateVacancyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let created_by = claims
        .user_id()
        .ok_or_else(|| Error::Unauthorized("invalid_token".to_string()))?;
    let vacancy = state.vacancy_service.create(created_by, payload).await?;
    Ok((StatusCode::CREATED, Json(VacancyResponse::from(vacancy))))
}

#[utoipa::path(
    get,
    path = "/api/hr/vacancies",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("search" = Option<String>, Query, description = "Title search"),
        ("include_archived" = Option<bool>, Query, description = "Include archived vacancies")
    ),
    responses(
        (status = 200, description = "List of vacancies", body = VacancyListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_vacancies(
    State(state): State<AppState>,
    Query(query): Query<VacancyListQuery>,
) -> Result<impl IntoResponse> {
    let result = state.vacancy_service.list(query).await?;
    Ok(Json(VacancyListResponse::from(result)))
}

#[utoipa::path(
    get,
    path = "/api/hr/vacancies/{id}",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    responses(
        (status = 200, description = "Vacancy found", body = VacancyResponse),
        (status = 404, description = "Vacancy not found")
    )
)]
#[axum::debug_handler]
pub async fn get_vacancy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let vacancy = state.vacancy_service.get_by_id(id).await?;
    Ok(Json(VacancyResponse::from(vacancy)))
}

#[utoipa::path(
    patch,
    path = "/api/hr/vacancies/{id}",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    request_body = UpdateVacancyPayload,
    responses(
        (status = 200, description = "Vacancy updated successfully", body = VacancyResponse),
        (status = 400, description = "Invalid payload or question list"),
        (status = 404, description = "Vacancy not found")
    )
)]
#[axum::debug_handler]
pub async fn update_vacancy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateVacancyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let vacancy = state.vacancy_service.update(id, payload).await?;
    Ok(Json(VacancyResponse::from(vacancy)))
}

#[utoipa::path(
    post,
    path = "/api/hr/vacancies/{id}/archive",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    responses(
        (status = 200, description = "Vacancy archived", body = VacancyResponse),
        (status = 404, description = "Vacancy not found")
    )
)]
#[axum::debug_handler]
pub async fn archive_vacancy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let vacancy = state.vacancy_service.archive(id).await?;
    Ok(Json(VacancyResponse::from(vacancy)))
}

#[utoipa::path(
    delete,
    path = "/api/hr/vacancies/{id}",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    responses(
        (status = 204, description = "Vacancy deleted"),
        (status = 404, description = "Vacancy not found"),
        (status = 409, description = "Vacancy has candidates and can only be archived")
    )
)]
#[axum::debug_handler]
pub async fn delete_vacancy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.vacancy_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/hr/vacancies/generate-description",
    request_body = GenerateDescriptionPayload,
    responses(
        (status = 200, description = "Generated description blocks", body = GeneratedDescriptionResponse)
    )
)]
#[axum::debug_handler]
pub async fn generate_description(
    State(state): State<AppState>,
    Json(payload): Json<GenerateDescriptionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let generated = state.ai_service.generate_vacancy_description(&payload).await?;
    Ok(Json(generated))
}
