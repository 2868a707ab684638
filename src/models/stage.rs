use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Terminal/in-flight classification a stage carries. Stored as a text code
/// on the stage row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Unknown,
    New,
    InProgress,
    Reject,
    Accept,
}

impl StageStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "NEW" => StageStatus::New,
            "IN_PROGRESS" => StageStatus::InProgress,
            "REJECT" => StageStatus::Reject,
            "ACCEPT" => StageStatus::Accept,
            _ => StageStatus::Unknown,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            StageStatus::Unknown => "UNKNOWN",
            StageStatus::New => "NEW",
            StageStatus::InProgress => "IN_PROGRESS",
            StageStatus::Reject => "REJECT",
            StageStatus::Accept => "ACCEPT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SelectionStage {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub sort_order: i64,
    pub status: String,
    pub is_standard: bool,
    pub is_active: bool,
}

/// One stage of a manager's resolved pipeline. `sort_order` is the effective
/// position, which for customized pipelines comes from the association row
/// rather than the stage itself.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PipelineStage {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub sort_order: i64,
    pub status: String,
    pub is_standard: bool,
}
