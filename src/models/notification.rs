use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub mod kinds {
    pub const APPLICATION_RECEIVED: &str = "application_received";
    pub const STATUS_UPDATE: &str = "status_update";
    pub const INTERVIEW_INVITATION: &str = "interview_invitation";
    pub const REJECTION: &str = "rejection";
    pub const OFFER: &str = "offer";
    pub const AI_ANALYSIS_COMPLETED: &str = "ai_analysis_completed";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub candidate_id: i64,
    pub kind: String,
    pub message: String,
    pub email_sent: bool,
    pub attempts: i64,
    pub max_attempts: i64,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
