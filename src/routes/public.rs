use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::path::Path as StdPath;
use tokio::fs;
use validator::Validate;

use crate::{
    dto::public_dto::{
        PublicVacancyListResponse, PublicVacancyResponse, SubmitApplicationPayload,
        SubmitApplicationResponse, TrackingResponse,
    },
    error::{Error, Result},
    AppState,
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const ALLOWED_RESUME_EXTS: [&str; 6] = ["pdf", "doc", "docx", "jpg", "jpeg", "png"];

#[derive(Debug, Deserialize)]
pub struct PublicListQuery {
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/public/vacancies",
    params(
        ("limit" = Option<i64>, Query, description = "Number of items to return")
    ),
    responses(
        (status = 200, description = "List of open vacancies", body = PublicVacancyListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_vacancies(
    State(state): State<AppState>,
    Query(query): Query<PublicListQuery>,
) -> Result<impl IntoResponse> {
    let items = state
        .vacancy_service
        .list_active(query.limit.unwrap_or(20))
        .await?;
    let items: Vec<PublicVacancyResponse> = items.into_iter().map(Into::into).collect();
    Ok(Json(PublicVacancyListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/api/public/vacancies/{id}",
    params(
        ("id" = i64, Path, description = "Vacancy ID")
    ),
    responses(
        (status = 200, description = "Vacancy found", body = PublicVacancyResponse),
        (status = 404, description = "Vacancy not found or archived")
    )
)]
#[axum::debug_handler]
pub async fn get_vacancy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let vacancy = state.vacancy_service.get_active(id).await?;
    Ok(Json(PublicVacancyResponse::from(vacancy)))
}

#[utoipa::path(
    post,
    path = "/api/public/applications",
    responses(
        (status = 201, description = "Application accepted", body = SubmitApplicationResponse),
        (status = 400, description = "Invalid form data or resume file"),
        (status = 409, description = "Duplicate application for this vacancy")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut vacancy_id: Option<i64> = None;
    let mut full_name = String::new();
    let mut email = String::new();
    let mut phone = String::new();
    let mut education = String::new();
    let mut experience_years: Option<i64> = None;
    let mut city = None;
    let mut vacancy_answers = None;
    let mut soft_answers = None;
    let mut cover_letter = None;
    let mut resume: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "vacancy_id" => {
                let raw = field.text().await.unwrap_or_default();
                vacancy_id = Some(raw.parse().map_err(|_| {
                    Error::BadRequest("vacancy_id must be a number".to_string())
                })?);
            }
            "full_name" => full_name = field.text().await.unwrap_or_default(),
            "email" => email = field.text().await.unwrap_or_default(),
            "phone" => phone = field.text().await.unwrap_or_default(),
            "education" => education = field.text().await.unwrap_or_default(),
            "experience_years" => {
                let raw = field.text().await.unwrap_or_default();
                experience_years = Some(raw.parse().map_err(|_| {
                    Error::BadRequest("experience_years must be a number".to_string())
                })?);
            }
            "city" => {
                let raw = field.text().await.unwrap_or_default();
                if !raw.trim().is_empty() {
                    city = Some(raw);
                }
            }
            "vacancy_answers" => {
                vacancy_answers = Some(parse_answer_map(&field_name, field.text().await?)?);
            }
            "soft_answers" => {
                soft_answers = Some(parse_answer_map(&field_name, field.text().await?)?);
            }
            "cover_letter" => {
                let raw = field.text().await.unwrap_or_default();
                if !raw.trim().is_empty() {
                    cover_letter = Some(raw);
                }
            }
            "resume" => {
                let filename = field.file_name().unwrap_or("resume.bin").to_string();
                let data = field.bytes().await?;
                if !data.is_empty() {
                    resume = Some((filename, data));
                }
            }
            _ => {}
        }
    }

    let payload = SubmitApplicationPayload {
        vacancy_id: vacancy_id
            .ok_or_else(|| Error::BadRequest("vacancy_id is required".to_string()))?,
        full_name,
        email,
        phone,
        education,
        experience_years: experience_years
            .ok_or_else(|| Error::BadRequest("experience_years is required".to_string()))?,
        city,
        vacancy_answers,
        soft_answers,
        cover_letter,
    };
    payload.validate()?;

    let (filename, data) =
        resume.ok_or_else(|| Error::BadRequest("Resume file is required".to_string()))?;
    let ext = checked_extension(&filename, &data)?;

    let ip = client_ip(&headers);
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let candidate = state
        .candidate_service
        .submit(&state.pipeline_service, payload, ip, user_agent)
        .await?;

    let resume_path = save_resume_file(&candidate.tracking_code, &ext, &data).await?;
    state
        .candidate_service
        .attach_resume(candidate.id, &resume_path)
        .await?;
    let job = state.ingest_service.enqueue(candidate.id).await?;
    tracing::info!(
        "Application {} accepted, resume queued as job {}",
        candidate.tracking_code,
        job.id
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitApplicationResponse {
            tracking_code: candidate.tracking_code,
            status: "received".to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/public/applications/{code}",
    params(
        ("code" = String, Path, description = "Tracking code issued at submission")
    ),
    responses(
        (status = 200, description = "Application status", body = TrackingResponse),
        (status = 404, description = "Unknown tracking code")
    )
)]
#[axum::debug_handler]
pub async fn track_application(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse> {
    let tracking = state.candidate_service.find_by_tracking(&code).await?;
    Ok(Json(tracking))
}

fn parse_answer_map(
    field_name: &str,
    raw: String,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    serde_json::from_str(&raw)
        .map_err(|_| Error::BadRequest(format!("{} must be a JSON object", field_name)))
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

fn checked_extension(filename: &str, data: &bytes::Bytes) -> Result<String> {
    let ext = StdPath::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !ALLOWED_RESUME_EXTS.contains(&ext.as_str()) {
        return Err(Error::BadRequest(format!(
            "File type .{} is not allowed",
            ext
        )));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(Error::BadRequest(
            "Resume file exceeds the 10 MB limit".to_string(),
        ));
    }

    if ext == "pdf" && !data.starts_with(b"%PDF") {
        return Err(Error::BadRequest("Invalid PDF file content".to_string()));
    }
    if (ext == "jpg" || ext == "jpeg") && !data.starts_with(&[0xFF, 0xD8]) {
        return Err(Error::BadRequest("Invalid JPEG file content".to_string()));
    }
    if ext == "png" && !data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Err(Error::BadRequest("Invalid PNG file content".to_string()));
    }
    Ok(ext)
}

async fn save_resume_file(tracking_code: &str, ext: &str, data: &bytes::Bytes) -> Result<String> {
    let uploads_dir = &crate::config::get_config().uploads_dir;
    fs::create_dir_all(uploads_dir).await?;

    let file_path = format!("{}/resume_{}.{}", uploads_dir, tracking_code, ext);
    fs::write(&file_path, data).await.map_err(|e| {
        tracing::error!("Failed to write resume file: {}", e);
        Error::Internal(format!("Failed to save file: {}", e))
    })?;
    Ok(file_path)
}
