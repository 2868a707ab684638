use crate::dto::pipeline_dto::{
    CreateRejectionReasonPayload, CreateStagePayload, UpdateRejectionReasonPayload,
    UpdateStagePayload,
};
use crate::error::{Error, Result};
use crate::models::rejection_reason::RejectionReason;
use crate::models::stage::{PipelineStage, SelectionStage, StageStatus};
use sqlx::SqlitePool;
use std::collections::HashSet;

const STATUS_CODES: [&str; 5] = ["UNKNOWN", "NEW", "IN_PROGRESS", "REJECT", "ACCEPT"];

#[derive(Clone)]
pub struct PipelineService {
    pool: SqlitePool,
}

impl PipelineService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Effective pipeline for a manager: their customized stage list when one
    /// exists, otherwise the standard catalog.
    pub async fn resolve(&self, manager_id: i64) -> Result<Vec<PipelineStage>> {
        let custom = sqlx::query_as::<_, PipelineStage>(
            "SELECT s.id, s.name, s.description, s.color, p.sort_order, s.status, s.is_standard
             FROM user_stage_pipeline p
             JOIN selection_stages s ON s.id = p.stage_id
             WHERE p.user_id = ? AND p.is_active = TRUE AND s.is_active = TRUE
             ORDER BY p.sort_order",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;
        if !custom.is_empty() {
            return Ok(custom);
        }
        self.standard().await
    }

    pub async fn standard(&self) -> Result<Vec<PipelineStage>> {
        let stages = sqlx::query_as::<_, PipelineStage>(
            "SELECT id, name, description, color, sort_order, status, is_standard
             FROM selection_stages
             WHERE is_standard = TRUE AND is_active = TRUE
             ORDER BY sort_order",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(stages)
    }

    pub async fn is_customized(&self, manager_id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_stage_pipeline WHERE user_id = ? AND is_active = TRUE",
        )
        .bind(manager_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Stage a fresh application lands on: the first NEW stage of the
    /// manager's pipeline.
    pub async fn first_stage(&self, manager_id: i64) -> Result<PipelineStage> {
        let stages = self.resolve(manager_id).await?;
        stages
            .iter()
            .find(|s| StageStatus::from_code(&s.status) == StageStatus::New)
            .or_else(|| stages.first())
            .cloned()
            .ok_or_else(|| Error::Internal("No pipeline stages configured".to_string()))
    }

    pub async fn stage_in_pipeline(&self, manager_id: i64, stage_id: i64) -> Result<bool> {
        let stages = self.resolve(manager_id).await?;
        Ok(stages.iter().any(|s| s.id == stage_id))
    }

    /// Replaces the manager's customization with the given ordered stage
    /// list. Standard entries are shared templates and are never placed in a
    /// pipeline directly: each one is copied into a private custom stage and
    /// the association row points at the copy. Custom entries are referenced
    /// as-is, so re-submitting a resolved pipeline reuses the copies.
    pub async fn customize(&self, manager_id: i64, stage_ids: &[i64]) -> Result<Vec<PipelineStage>> {
        if stage_ids.is_empty() {
            return Err(Error::BadRequest("Pipeline cannot be empty".to_string()));
        }
        let unique: HashSet<i64> = stage_ids.iter().copied().collect();
        if unique.len() != stage_ids.len() {
            return Err(Error::BadRequest(
                "Pipeline contains duplicate stage ids".to_string(),
            ));
        }

        let placeholders = vec!["?"; stage_ids.len()].join(", ");
        let query = format!(
            "SELECT id, name, description, color, sort_order, status, is_standard, is_active
             FROM selection_stages WHERE id IN ({}) AND is_active = TRUE",
            placeholders
        );
        let mut statement = sqlx::query_as::<_, SelectionStage>(&query);
        for id in stage_ids {
            statement = statement.bind(id);
        }
        let stages = statement.fetch_all(&self.pool).await?;

        let mut ordered = Vec::with_capacity(stage_ids.len());
        for id in stage_ids {
            let Some(stage) = stages.iter().find(|s| s.id == *id) else {
                return Err(Error::BadRequest(format!(
                    "Unknown or inactive stage id {}",
                    id
                )));
            };
            ordered.push(stage);
        }
        let has = |status: StageStatus| {
            ordered
                .iter()
                .any(|s| StageStatus::from_code(&s.status) == status)
        };
        if !has(StageStatus::New) {
            return Err(Error::BadRequest(
                "Pipeline must contain an entry stage".to_string(),
            ));
        }
        if !has(StageStatus::Accept) || !has(StageStatus::Reject) {
            return Err(Error::BadRequest(
                "Pipeline must contain accept and reject stages".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_stage_pipeline WHERE user_id = ?")
            .bind(manager_id)
            .execute(&mut *tx)
            .await?;
        for (position, stage) in ordered.iter().enumerate() {
            let member_id = if stage.is_standard {
                sqlx::query_scalar::<_, i64>(
                    "INSERT INTO selection_stages
                         (name, description, color, sort_order, status, is_standard, is_active)
                     VALUES (?, ?, ?, ?, ?, FALSE, TRUE)
                     RETURNING id",
                )
                .bind(&stage.name)
                .bind(&stage.description)
                .bind(&stage.color)
                .bind(stage.sort_order)
                .bind(&stage.status)
                .fetch_one(&mut *tx)
                .await?
            } else {
                stage.id
            };
            sqlx::query(
                "INSERT INTO user_stage_pipeline (user_id, stage_id, sort_order, is_active)
                 VALUES (?, ?, ?, TRUE)",
            )
            .bind(manager_id)
            .bind(member_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.resolve(manager_id).await
    }

    /// Drops the customization so the manager falls back to the standard
    /// catalog.
    pub async fn reset(&self, manager_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM user_stage_pipeline WHERE user_id = ?")
            .bind(manager_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_stage(&self, id: i64) -> Result<SelectionStage> {
        let stage = sqlx::query_as::<_, SelectionStage>(
            "SELECT id, name, description, color, sort_order, status, is_standard, is_active
             FROM selection_stages WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stage)
    }

    pub async fn list_stages(&self, include_inactive: bool) -> Result<Vec<SelectionStage>> {
        let query = if include_inactive {
            "SELECT id, name, description, color, sort_order, status, is_standard, is_active
             FROM selection_stages ORDER BY sort_order"
        } else {
            "SELECT id, name, description, color, sort_order, status, is_standard, is_active
             FROM selection_stages WHERE is_active = TRUE ORDER BY sort_order"
        };
        let stages = sqlx::query_as::<_, SelectionStage>(query)
            .fetch_all(&self.pool)
            .await?;
        Ok(stages)
    }

    pub async fn create_stage(&self, payload: CreateStagePayload) -> Result<SelectionStage> {
        let color = payload.color.unwrap_or_else(|| "#6c757d".to_string());
        if !is_hex_color(&color) {
            return Err(Error::BadRequest(
                "Color must be a hex value like #6c757d".to_string(),
            ));
        }
        let status = payload.status.unwrap_or_else(|| "UNKNOWN".to_string());
        if !STATUS_CODES.contains(&status.as_str()) {
            return Err(Error::BadRequest(format!("Unknown stage status '{}'", status)));
        }
        let sort_order = match payload.sort_order {
            Some(order) => order,
            None => {
                let max: Option<i64> =
                    sqlx::query_scalar("SELECT MAX(sort_order) FROM selection_stages")
                        .fetch_one(&self.pool)
                        .await?;
                max.unwrap_or(0) + 1
            }
        };

        let stage = sqlx::query_as::<_, SelectionStage>(
            "INSERT INTO selection_stages (name, description, color, sort_order, status, is_standard, is_active)
             VALUES (?, ?, ?, ?, ?, FALSE, TRUE)
             RETURNING id, name, description, color, sort_order, status, is_standard, is_active",
        )
        .bind(payload.name)
        .bind(payload.description)
        .bind(color)
        .bind(sort_order)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(stage)
    }

    pub async fn update_stage(&self, id: i64, payload: UpdateStagePayload) -> Result<SelectionStage> {
        let existing = self.get_stage(id).await?;
        if let Some(ref color) = payload.color {
            if !is_hex_color(color) {
                return Err(Error::BadRequest(
                    "Color must be a hex value like #6c757d".to_string(),
                ));
            }
        }
        if let Some(ref status) = payload.status {
            if !STATUS_CODES.contains(&status.as_str()) {
                return Err(Error::BadRequest(format!("Unknown stage status '{}'", status)));
            }
        }
        if existing.is_standard && payload.is_active == Some(false) {
            return Err(Error::BadRequest(
                "Standard stages cannot be deactivated".to_string(),
            ));
        }

        let stage = sqlx::query_as::<_, SelectionStage>(
            "UPDATE selection_stages
             SET name = COALESCE(?, name),
                 description = COALESCE(?, description),
                 color = COALESCE(?, color),
                 sort_order = COALESCE(?, sort_order),
                 status = COALESCE(?, status),
                 is_active = COALESCE(?, is_active)
             WHERE id = ?
             RETURNING id, name, description, color, sort_order, status, is_standard, is_active",
        )
        .bind(payload.name)
        .bind(payload.description)
        .bind(payload.color)
        .bind(payload.sort_order)
        .bind(payload.status)
        .bind(payload.is_active)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stage)
    }

    pub async fn delete_stage(&self, id: i64) -> Result<()> {
        let stage = self.get_stage(id).await?;
        if stage.is_standard {
            return Err(Error::BadRequest(
                "Standard stages cannot be deleted".to_string(),
            ));
        }
        let in_use: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE current_stage_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if in_use > 0 {
            return Err(Error::Conflict(
                "Stage is referenced by existing candidates".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_stage_pipeline WHERE stage_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM selection_stages WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_rejection_reason(&self, id: i64) -> Result<RejectionReason> {
        let reason = sqlx::query_as::<_, RejectionReason>(
            "SELECT id, name, description, is_active, is_default, sort_order
             FROM rejection_reasons WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(reason)
    }

    pub async fn list_rejection_reasons(&self, include_inactive: bool) -> Result<Vec<RejectionReason>> {
        let query = if include_inactive {
            "SELECT id, name, description, is_active, is_default, sort_order
             FROM rejection_reasons ORDER BY sort_order"
        } else {
            "SELECT id, name, description, is_active, is_default, sort_order
             FROM rejection_reasons WHERE is_active = TRUE ORDER BY sort_order"
        };
        let reasons = sqlx::query_as::<_, RejectionReason>(query)
            .fetch_all(&self.pool)
            .await?;
        Ok(reasons)
    }

    pub async fn create_rejection_reason(
        &self,
        payload: CreateRejectionReasonPayload,
    ) -> Result<RejectionReason> {
        let sort_order = match payload.sort_order {
            Some(order) => order,
            None => {
                let max: Option<i64> =
                    sqlx::query_scalar("SELECT MAX(sort_order) FROM rejection_reasons")
                        .fetch_one(&self.pool)
                        .await?;
                max.unwrap_or(0) + 1
            }
        };
        let reason = sqlx::query_as::<_, RejectionReason>(
            "INSERT INTO rejection_reasons (name, description, is_active, is_default, sort_order)
             VALUES (?, ?, TRUE, ?, ?)
             RETURNING id, name, description, is_active, is_default, sort_order",
        )
        .bind(payload.name)
        .bind(payload.description)
        .bind(payload.is_default.unwrap_or(false))
        .bind(sort_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(reason)
    }

    pub async fn update_rejection_reason(
        &self,
        id: i64,
        payload: UpdateRejectionReasonPayload,
    ) -> Result<RejectionReason> {
        self.get_rejection_reason(id).await?;
        let reason = sqlx::query_as::<_, RejectionReason>(
            "UPDATE rejection_reasons
             SET name = COALESCE(?, name),
                 description = COALESCE(?, description),
                 sort_order = COALESCE(?, sort_order),
                 is_default = COALESCE(?, is_default),
                 is_active = COALESCE(?, is_active)
             WHERE id = ?
             RETURNING id, name, description, is_active, is_default, sort_order",
        )
        .bind(payload.name)
        .bind(payload.description)
        .bind(payload.sort_order)
        .bind(payload.is_default)
        .bind(payload.is_active)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(reason)
    }

    pub async fn delete_rejection_reason(&self, id: i64) -> Result<()> {
        self.get_rejection_reason(id).await?;
        let in_use: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE rejection_reason_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if in_use > 0 {
            return Err(Error::Conflict(
                "Rejection reason is referenced by existing candidates".to_string(),
            ));
        }
        sqlx::query("DELETE FROM rejection_reasons WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
