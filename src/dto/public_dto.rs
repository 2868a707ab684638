use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

pub const EDUCATION_LEVELS: [&str; 4] = ["secondary", "vocational", "higher", "phd"];

/// Application form fields gathered from the multipart request. The resume
/// file travels separately.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitApplicationPayload {
    pub vacancy_id: i64,
    #[validate(length(min = 5, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 10, max = 20))]
    pub phone: String,
    pub education: String,
    #[validate(range(min = 0, max = 50))]
    pub experience_years: i64,
    pub city: Option<String>,
    pub vacancy_answers: Option<serde_json::Map<String, JsonValue>>,
    pub soft_answers: Option<serde_json::Map<String, JsonValue>>,
    #[validate(length(max = 4000))]
    pub cover_letter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubmitApplicationResponse {
    pub tracking_code: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PublicVacancyResponse {
    pub id: i64,
    pub title: String,
    pub employment_type: Option<String>,
    pub description_tasks: Option<String>,
    pub description_conditions: Option<String>,
    pub questions: JsonValue,
    pub soft_questions: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PublicVacancyListResponse {
    pub items: Vec<PublicVacancyResponse>,
}

/// Status view a candidate sees when following their tracking link. Carries
/// no contact data.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct TrackingResponse {
    pub vacancy_title: String,
    pub stage_name: String,
    pub stage_color: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub notifications: Vec<TrackingNotification>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct TrackingNotification {
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<crate::models::Vacancy> for PublicVacancyResponse {
    fn from(value: crate::models::Vacancy) -> Self {
        Self {
            id: value.id,
            title: value.title,
            employment_type: value.employment_type,
            description_tasks: value.description_tasks,
            description_conditions: value.description_conditions,
            questions: value.questions,
            soft_questions: value.soft_questions,
        }
    }
}
