use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Candidate {
    pub id: i64,
    pub vacancy_id: i64,
    pub owning_manager_id: i64,
    pub current_stage_id: i64,
    pub full_name: String,
    pub email_encrypted: String,
    pub phone_encrypted: String,
    pub phone_index: String,
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
