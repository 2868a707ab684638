use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CandidateSummary {
    pub id: i64,
    pub full_name: String,
    pub vacancy_id: i64,
    pub vacancy_title: String,
    pub stage_id: i64,
    pub stage_name: String,
    pub stage_color: String,
    pub stage_status: String,
    pub ai_match_percent: Option<i64>,
    pub has_resume: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDetail {
    pub id: i64,
    pub vacancy_id: i64,
    pub owning_manager_id: i64,
    pub current_stage_id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub base_answers: Option<JsonValue>,
    pub vacancy_answers: Option<JsonValue>,
    pub soft_answers: Option<JsonValue>,
    pub cover_letter: Option<String>,
    pub resume_path: Option<String>,
    pub resume_text: Option<String>,
    pub resume_data: Option<JsonValue>,
    pub ai_match_percent: Option<i64>,
    pub ai_pros: Option<String>,
    pub ai_cons: Option<String>,
    pub ai_recommendation: Option<String>,
    pub ai_score_location: Option<i64>,
    pub ai_score_experience: Option<i64>,
    pub ai_score_tech: Option<i64>,
    pub ai_score_education: Option<i64>,
    pub ai_score_comments_location: Option<String>,
    pub ai_score_comments_experience: Option<String>,
    pub ai_score_comments_tech: Option<String>,
    pub ai_score_comments_education: Option<String>,
    pub ai_mismatch_notes: Option<String>,
    pub ai_data_consistency: Option<JsonValue>,
    pub ai_answer_quality: Option<JsonValue>,
    pub ai_data_completeness: Option<JsonValue>,
    pub rejection_reason_id: Option<i64>,
    pub tracking_code: String,
    pub hr_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CandidateListQuery {
    pub vacancy_id: Option<i64>,
    pub stage_id: Option<i64>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateListResponse {
    pub items: Vec<CandidateSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl From<crate::services::candidate_service::CandidateList> for CandidateListResponse {
    fn from(value: crate::services::candidate_service::CandidateList) -> Self {
        Self {
            items: value.items,
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MoveStagePayload {
    pub stage_id: i64,
    pub rejection_reason_id: Option<i64>,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HrCommentPayload {
    #[validate(length(min = 1, max = 2000))]
    pub comment: String,
}
