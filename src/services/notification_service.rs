use crate::error::{Error, Result};
use crate::models::notification::{kinds, Notification};
use crate::models::stage::StageStatus;
use crate::utils::crypto::FieldCipher;
use crate::utils::time;
use reqwest::Client;
use sqlx::{Row, SqlitePool};
use std::time::Duration;

/// How long a claimed notification stays invisible to other workers before
/// it becomes eligible again.
const LEASE_SECS: i64 = 120;

pub fn kind_for_transition(status: StageStatus, stage_name: &str) -> &'static str {
    match status {
        StageStatus::Reject => kinds::REJECTION,
        StageStatus::Accept => kinds::OFFER,
        _ => {
            let lowered = stage_name.to_lowercase();
            if lowered.contains("собеседование") || lowered.contains("интервью") {
                kinds::INTERVIEW_INVITATION
            } else {
                kinds::STATUS_UPDATE
            }
        }
    }
}

pub fn message_for(kind: &str, vacancy_title: &str, stage_name: &str) -> String {
    match kind {
        kinds::APPLICATION_RECEIVED => format!(
            "Ваша заявка на вакансию '{}' принята. Мы свяжемся с вами после рассмотрения.",
            vacancy_title
        ),
        kinds::INTERVIEW_INVITATION => format!(
            "Приглашаем вас на собеседование по вакансии '{}'. Дата: будет согласована дополнительно.",
            vacancy_title
        ),
        kinds::REJECTION => format!(
            "К сожалению, ваша кандидатура на вакансию '{}' была отклонена. Благодарим за интерес к нашей компании.",
            vacancy_title
        ),
        kinds::OFFER => format!(
            "Поздравляем! Вам сделано предложение о работе на позицию '{}'. Ожидаем вашего ответа.",
            vacancy_title
        ),
        _ => format!(
            "Статус вашей заявки на вакансию '{}' изменен на '{}'.",
            vacancy_title, stage_name
        ),
    }
}

pub fn subject_for(kind: &str, vacancy_title: &str) -> String {
    if kind == kinds::APPLICATION_RECEIVED {
        format!("Заявка получена: {}", vacancy_title)
    } else {
        format!("Обновление статуса заявки: {}", vacancy_title)
    }
}

#[derive(Clone)]
pub struct NotificationService {
    pool: SqlitePool,
    client: Client,
    cipher: FieldCipher,
    gateway_url: Option<String>,
}

impl NotificationService {
    pub fn new(pool: SqlitePool, cipher: FieldCipher, gateway_url: Option<String>) -> Self {
        Self {
            pool,
            client: Client::new(),
            cipher,
            gateway_url,
        }
    }

    pub async fn list_for_candidate(&self, candidate_id: i64) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT id, candidate_id, kind, message, email_sent, attempts, max_attempts,
                    next_retry_at, created_at
             FROM notifications WHERE candidate_id = ? ORDER BY created_at DESC",
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Claims the oldest undelivered notification and attempts delivery.
    /// Returns false when there was nothing to do. The claim bumps the
    /// attempt counter and leases the row in a single statement so
    /// concurrent workers never pick the same notification.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(gateway_url) = self.gateway_url.clone() else {
            return Ok(false);
        };

        let lease_until = time::now() + chrono::Duration::seconds(LEASE_SECS);
        let row_opt = sqlx::query(
            r#"UPDATE notifications
               SET attempts = attempts + 1, next_retry_at = ?
               WHERE id = (
                   SELECT id FROM notifications
                   WHERE email_sent = FALSE AND attempts < max_attempts
                     AND (next_retry_at IS NULL OR next_retry_at <= ?)
                   ORDER BY created_at ASC
                   LIMIT 1
               )
               RETURNING id, candidate_id, kind, message, attempts, max_attempts"#,
        )
        .bind(lease_until)
        .bind(time::now())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row_opt else { return Ok(false) };
        let id: i64 = row.try_get("id")?;
        let candidate_id: i64 = row.try_get("candidate_id")?;
        let kind: String = row.try_get("kind")?;
        let message: String = row.try_get("message")?;
        let attempts: i64 = row.try_get("attempts")?;
        let max_attempts: i64 = row.try_get("max_attempts")?;

        match self.deliver(&gateway_url, id, candidate_id, &kind, &message).await {
            Ok(()) => {
                sqlx::query(
                    "UPDATE notifications SET email_sent = TRUE, next_retry_at = NULL WHERE id = ?",
                )
                .bind(id)
                .execute(&self.pool)
                .await?;
            }
            Err(err) => {
                if attempts < max_attempts {
                    let retry_at = time::now() + time::retry_backoff(attempts);
                    sqlx::query("UPDATE notifications SET next_retry_at = ? WHERE id = ?")
                        .bind(retry_at)
                        .bind(id)
                        .execute(&self.pool)
                        .await?;
                    tracing::warn!(
                        "Notification {} delivery failed (attempt {}): {}",
                        id,
                        attempts,
                        err
                    );
                } else {
                    tracing::warn!(
                        "Notification {} abandoned after {} attempts: {}",
                        id,
                        attempts,
                        err
                    );
                }
            }
        }

        Ok(true)
    }

    async fn deliver(
        &self,
        gateway_url: &str,
        notification_id: i64,
        candidate_id: i64,
        kind: &str,
        message: &str,
    ) -> Result<()> {
        let row = sqlx::query(
            "SELECT c.email_encrypted, v.title
             FROM candidates c
             JOIN vacancies v ON v.id = c.vacancy_id
             WHERE c.id = ?",
        )
        .bind(candidate_id)
        .fetch_one(&self.pool)
        .await?;
        let email_encrypted: String = row.try_get("email_encrypted")?;
        let title: String = row.try_get("title")?;
        let to = self.cipher.decrypt(&email_encrypted)?;

        let payload = serde_json::json!({
            "to": to,
            "subject": subject_for(kind, &title),
            "body": message,
            "notification_id": notification_id,
        });
        let resp = self
            .client
            .post(gateway_url)
            .json(&payload)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Internal(format!(
                "Mail gateway returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Direct alert to a manager, bypassing the outbox. A missing gateway
    /// makes this a no-op.
    pub async fn send_manager_alert(&self, manager_id: i64, subject: &str, body: &str) -> Result<()> {
        let Some(gateway_url) = self.gateway_url.clone() else {
            return Ok(());
        };
        let email_encrypted: String =
            sqlx::query_scalar("SELECT email_encrypted FROM users WHERE id = ?")
                .bind(manager_id)
                .fetch_one(&self.pool)
                .await?;
        let to = self.cipher.decrypt(&email_encrypted)?;

        let payload = serde_json::json!({ "to": to, "subject": subject, "body": body });
        let resp = self
            .client
            .post(&gateway_url)
            .json(&payload)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Internal(format!(
                "Mail gateway returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_kind_follows_stage_status_and_name() {
        assert_eq!(kind_for_transition(StageStatus::Reject, "Отказ"), kinds::REJECTION);
        assert_eq!(
            kind_for_transition(StageStatus::Accept, "Принят на работу"),
            kinds::OFFER
        );
        assert_eq!(
            kind_for_transition(StageStatus::InProgress, "Собеседование с HR"),
            kinds::INTERVIEW_INVITATION
        );
        assert_eq!(
            kind_for_transition(StageStatus::InProgress, "Техническое интервью"),
            kinds::INTERVIEW_INVITATION
        );
        assert_eq!(
            kind_for_transition(StageStatus::InProgress, "Тестовое задание"),
            kinds::STATUS_UPDATE
        );
    }

    #[test]
    fn messages_and_subjects_mention_the_vacancy() {
        let message = message_for(kinds::APPLICATION_RECEIVED, "Rust разработчик", "");
        assert!(message.contains("Rust разработчик"));

        let message = message_for(kinds::STATUS_UPDATE, "Rust разработчик", "Рассмотрение резюме");
        assert!(message.contains("Рассмотрение резюме"));

        assert_eq!(
            subject_for(kinds::APPLICATION_RECEIVED, "QA инженер"),
            "Заявка получена: QA инженер"
        );
        assert_eq!(
            subject_for(kinds::REJECTION, "QA инженер"),
            "Обновление статуса заявки: QA инженер"
        );
    }
}
