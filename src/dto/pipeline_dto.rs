use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::PipelineStage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub customized: bool,
    pub stages: Vec<PipelineStage>,
}

/// Full ordered stage list a manager wants as their pipeline. Order in the
/// vector becomes the pipeline order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CustomizePipelinePayload {
    #[validate(length(min = 1))]
    pub stage_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStagePayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStagePayload {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i64>,
    pub status: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRejectionReasonPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub sort_order: Option<i64>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateRejectionReasonPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub sort_order: Option<i64>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
}
