use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::models::vacancy::{Question, Vacancy};
use crate::services::vacancy_service::VacancyList;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateVacancyPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub employment_type: Option<String>,
    pub description_tasks: Option<String>,
    pub description_conditions: Option<String>,
    pub ideal_profile: Option<String>,
    pub questions: Option<Vec<Question>>,
    pub soft_questions: Option<Vec<Question>>,
    pub ai_metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateVacancyPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub employment_type: Option<String>,
    pub description_tasks: Option<String>,
    pub description_conditions: Option<String>,
    pub ideal_profile: Option<String>,
    pub questions: Option<Vec<Question>>,
    pub soft_questions: Option<Vec<Question>>,
    pub is_active: Option<bool>,
    pub ai_metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VacancyResponse {
    pub id: i64,
    pub title: String,
    pub employment_type: Option<String>,
    pub description_tasks: Option<String>,
    pub description_conditions: Option<String>,
    pub ideal_profile: Option<String>,
    pub questions: JsonValue,
    pub soft_questions: JsonValue,
    pub is_active: bool,
    pub created_by: i64,
    pub ai_metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VacancyListResponse {
    pub items: Vec<VacancyResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VacancyListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub include_archived: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct GenerateDescriptionPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GeneratedDescriptionResponse {
    pub description_tasks: String,
    pub description_conditions: String,
    pub ideal_profile: String,
    pub ai_metadata: JsonValue,
}

impl From<Vacancy> for VacancyResponse {
    fn from(value: Vacancy) -> Self {
        Self {
            id: value.id,
            title: value.title,
            employment_type: value.employment_type,
            description_tasks: value.description_tasks,
            description_conditions: value.description_conditions,
            ideal_profile: value.ideal_profile,
            questions: value.questions,
            soft_questions: value.soft_questions,
            is_active: value.is_active,
            created_by: value.created_by,
            ai_metadata: value.ai_metadata,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<VacancyList> for VacancyListResponse {
    fn from(value: VacancyList) -> Self {
        Self {
            items: value.items.into_iter().map(Into::into).collect(),
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}
