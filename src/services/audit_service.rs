use crate::error::Result;
use crate::models::audit_log::AuditLog;
use crate::utils::time;
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AuditService {
    pool: SqlitePool,
}

impl AuditService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn log(
        &self,
        user_id: Option<i64>,
        action: &str,
        entity_type: &str,
        entity_id: i64,
        changes: Option<JsonValue>,
        ip: Option<String>,
        ua: Option<String>,
    ) -> Result<AuditLog> {
        let row = sqlx::query_as::<_, AuditLog>(
            "INSERT INTO audit_logs (user_id, action, entity_type, entity_id, changes, ip_address, user_agent, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id, user_id, action, entity_type, entity_id, changes, ip_address, user_agent, created_at",
        )
        .bind(user_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(changes)
        .bind(ip)
        .bind(ua)
        .bind(time::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
        limit: i64,
    ) -> Result<Vec<AuditLog>> {
        let limit = if limit <= 0 { 50 } else { limit.min(200) };
        let rows = sqlx::query_as::<_, AuditLog>(
            "SELECT id, user_id, action, entity_type, entity_id, changes, ip_address, user_agent, created_at
             FROM audit_logs
             WHERE entity_type = ? AND entity_id = ?
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
