use crate::dto::candidate_dto::{
    CandidateDetail, CandidateListQuery, CandidateSummary, MoveStagePayload,
};
use crate::dto::public_dto::{
    SubmitApplicationPayload, TrackingNotification, TrackingResponse, EDUCATION_LEVELS,
};
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::stage::StageStatus;
use crate::models::vacancy::{validate_answers, Vacancy};
use crate::services::notification_service::{kind_for_transition, message_for};
use crate::services::pipeline_service::PipelineService;
use crate::utils::crypto::{normalize_email, normalize_phone, FieldCipher};
use crate::utils::resume_text::{clean_extracted_text, extract_contacts};
use crate::utils::time;
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use uuid::Uuid;

const CANDIDATE_COLUMNS: &str =
    "id, vacancy_id, owning_manager_id, current_stage_id, full_name, email_encrypted, \
     phone_encrypted, phone_index, base_answers, vacancy_answers, soft_answers, cover_letter, \
     resume_path, resume_text, resume_data, ai_match_percent, ai_pros, ai_cons, \
     ai_recommendation, ai_score_location, ai_score_experience, ai_score_tech, \
     ai_score_education, ai_score_comments_location, ai_score_comments_experience, \
     ai_score_comments_tech, ai_score_comments_education, ai_mismatch_notes, \
     ai_data_consistency, ai_answer_quality, ai_data_completeness, rejection_reason_id, \
     tracking_code, hr_comment, created_at, updated_at";

#[derive(Clone)]
pub struct CandidateService {
    pool: SqlitePool,
    cipher: FieldCipher,
}

pub struct CandidateList {
    pub items: Vec<CandidateSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl CandidateService {
    pub fn new(pool: SqlitePool, cipher: FieldCipher) -> Self {
        Self { pool, cipher }
    }

    /// Public application intake. Validates the form against the vacancy's
    /// question lists, rejects duplicate submissions by phone, resolves the
    /// entry stage of the owning manager's pipeline and creates the
    /// candidate together with its first notification and audit entry in
    /// one transaction.
    pub async fn submit(
        &self,
        pipeline: &PipelineService,
        payload: SubmitApplicationPayload,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<Candidate> {
        if !EDUCATION_LEVELS.contains(&payload.education.as_str()) {
            return Err(Error::BadRequest(format!(
                "Unknown education level '{}'",
                payload.education
            )));
        }

        let vacancy = sqlx::query_as::<_, Vacancy>(
            "SELECT id, title, employment_type, description_tasks, description_conditions,
                    ideal_profile, questions, soft_questions, is_active, created_by,
                    ai_metadata, created_at, updated_at
             FROM vacancies WHERE id = ? AND is_active = TRUE",
        )
        .bind(payload.vacancy_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Vacancy not found or archived".to_string()))?;

        let questions = vacancy
            .question_list()
            .map_err(|_| Error::Internal("Vacancy question list is malformed".to_string()))?;
        let soft_questions = vacancy
            .soft_question_list()
            .map_err(|_| Error::Internal("Vacancy question list is malformed".to_string()))?;

        let empty = serde_json::Map::new();
        validate_answers(
            &questions,
            payload.vacancy_answers.as_ref().unwrap_or(&empty),
        )
        .map_err(Error::BadRequest)?;
        validate_answers(&soft_questions, payload.soft_answers.as_ref().unwrap_or(&empty))
            .map_err(Error::BadRequest)?;

        let phone = normalize_phone(&payload.phone);
        if phone.trim_start_matches('+').len() < 10 {
            return Err(Error::BadRequest("Phone number is too short".to_string()));
        }
        let email = normalize_email(&payload.email);
        let phone_index = self.cipher.blind_index(&phone);

        // The cipher is non-deterministic, so equality goes through the blind
        // index; decrypt the hits to rule out index collisions.
        let hits: Vec<String> = sqlx::query_scalar(
            "SELECT phone_encrypted FROM candidates WHERE vacancy_id = ? AND phone_index = ?",
        )
        .bind(vacancy.id)
        .bind(&phone_index)
        .fetch_all(&self.pool)
        .await?;
        for stored in &hits {
            if self.cipher.decrypt(stored)? == phone {
                return Err(Error::Conflict(
                    "You have already applied for this vacancy, your application is awaiting review"
                        .to_string(),
                ));
            }
        }

        let first_stage = pipeline.first_stage(vacancy.created_by).await?;
        let base_answers = serde_json::json!({
            "education": payload.education,
            "experience_years": payload.experience_years,
            "city": payload.city,
        });
        let tracking_code = Uuid::new_v4().to_string();
        let now = time::now();

        let insert_query = format!(
            "INSERT INTO candidates (
                vacancy_id, owning_manager_id, current_stage_id, full_name,
                email_encrypted, phone_encrypted, phone_index, base_answers,
                vacancy_answers, soft_answers, cover_letter, tracking_code,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}",
            CANDIDATE_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let candidate = sqlx::query_as::<_, Candidate>(&insert_query)
            .bind(vacancy.id)
            .bind(vacancy.created_by)
            .bind(first_stage.id)
            .bind(&payload.full_name)
            .bind(self.cipher.encrypt(&email)?)
            .bind(self.cipher.encrypt(&phone)?)
            .bind(&phone_index)
            .bind(base_answers)
            .bind(payload.vacancy_answers.map(JsonValue::Object))
            .bind(payload.soft_answers.map(JsonValue::Object))
            .bind(&payload.cover_letter)
            .bind(&tracking_code)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        insert_notification(
            &mut tx,
            candidate.id,
            crate::models::notification::kinds::APPLICATION_RECEIVED,
            &message_for(
                crate::models::notification::kinds::APPLICATION_RECEIVED,
                &vacancy.title,
                &first_stage.name,
            ),
        )
        .await?;
        insert_audit(
            &mut tx,
            None,
            "candidate_created",
            "candidate",
            candidate.id,
            serde_json::json!({
                "full_name": candidate.full_name,
                "vacancy_id": vacancy.id,
                "stage_id": first_stage.id,
            }),
            ip.as_deref(),
            user_agent.as_deref(),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Candidate {} created for vacancy '{}' at stage '{}'",
            candidate.id,
            vacancy.title,
            first_stage.name
        );
        Ok(candidate)
    }

    /// Applicant-facing status lookup by tracking code. The response carries
    /// the notification feed so applicants see the same messages that were
    /// mailed to them.
    pub async fn find_by_tracking(&self, code: &str) -> Result<TrackingResponse> {
        let candidate_id: i64 =
            sqlx::query_scalar("SELECT id FROM candidates WHERE tracking_code = ?")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        let mut tracking = sqlx::query_as::<_, TrackingResponse>(
            "SELECT v.title AS vacancy_title, s.name AS stage_name, s.color AS stage_color,
                    s.status AS status, r.name AS rejection_reason,
                    c.created_at AS submitted_at, c.updated_at
             FROM candidates c
             JOIN vacancies v ON v.id = c.vacancy_id
             JOIN selection_stages s ON s.id = c.current_stage_id
             LEFT JOIN rejection_reasons r ON r.id = c.rejection_reason_id
             WHERE c.id = ?",
        )
        .bind(candidate_id)
        .fetch_one(&self.pool)
        .await?;

        tracking.notifications = sqlx::query_as::<_, TrackingNotification>(
            "SELECT kind, message, created_at FROM notifications
             WHERE candidate_id = ? ORDER BY created_at DESC",
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tracking)
    }

    pub async fn get(&self, id: i64) -> Result<Candidate> {
        let query = format!("SELECT {} FROM candidates WHERE id = ?", CANDIDATE_COLUMNS);
        let candidate = sqlx::query_as::<_, Candidate>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(candidate)
    }

    pub fn to_detail(&self, candidate: Candidate) -> Result<CandidateDetail> {
        let email = self.cipher.decrypt(&candidate.email_encrypted)?;
        let phone = self.cipher.decrypt(&candidate.phone_encrypted)?;
        Ok(CandidateDetail {
            id: candidate.id,
            vacancy_id: candidate.vacancy_id,
            owning_manager_id: candidate.owning_manager_id,
            current_stage_id: candidate.current_stage_id,
            full_name: candidate.full_name,
            email,
            phone,
            base_answers: candidate.base_answers,
            vacancy_answers: candidate.vacancy_answers,
            soft_answers: candidate.soft_answers,
            cover_letter: candidate.cover_letter,
            resume_path: candidate.resume_path,
            resume_text: candidate.resume_text,
            resume_data: candidate.resume_data,
            ai_match_percent: candidate.ai_match_percent,
            ai_pros: candidate.ai_pros,
            ai_cons: candidate.ai_cons,
            ai_recommendation: candidate.ai_recommendation,
            ai_score_location: candidate.ai_score_location,
            ai_score_experience: candidate.ai_score_experience,
            ai_score_tech: candidate.ai_score_tech,
            ai_score_education: candidate.ai_score_education,
            ai_score_comments_location: candidate.ai_score_comments_location,
            ai_score_comments_experience: candidate.ai_score_comments_experience,
            ai_score_comments_tech: candidate.ai_score_comments_tech,
            ai_score_comments_education: candidate.ai_score_comments_education,
            ai_mismatch_notes: candidate.ai_mismatch_notes,
            ai_data_consistency: candidate.ai_data_consistency,
            ai_answer_quality: candidate.ai_answer_quality,
            ai_data_completeness: candidate.ai_data_completeness,
            rejection_reason_id: candidate.rejection_reason_id,
            tracking_code: candidate.tracking_code,
            hr_comment: candidate.hr_comment,
            created_at: candidate.created_at,
            updated_at: candidate.updated_at,
        })
    }

    pub async fn list(
        &self,
        manager_id: Option<i64>,
        query: CandidateListQuery,
    ) -> Result<CandidateList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(manager_id) = manager_id {
            filters.push(format!("c.owning_manager_id = {}", manager_id));
        }
        if let Some(vacancy_id) = query.vacancy_id {
            filters.push(format!("c.vacancy_id = {}", vacancy_id));
        }
        if let Some(stage_id) = query.stage_id {
            filters.push(format!("c.current_stage_id = {}", stage_id));
        }
        if let Some(search) = query.search {
            filters.push("c.full_name LIKE ?".to_string());
            args.push(format!("%{}%", search));
        }

        let where_clause = if filters.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };

        let items_query = format!(
            "SELECT c.id, c.full_name, c.vacancy_id, v.title AS vacancy_title,
                    s.id AS stage_id, s.name AS stage_name, s.color AS stage_color,
                    s.status AS stage_status, c.ai_match_percent,
                    c.resume_path IS NOT NULL AS has_resume, c.created_at
             FROM candidates c
             JOIN vacancies v ON v.id = c.vacancy_id
             JOIN selection_stages s ON s.id = c.current_stage_id
             {}
             ORDER BY c.created_at DESC
             LIMIT ? OFFSET ?",
            where_clause
        );
        let total_query = format!("SELECT COUNT(*) FROM candidates c {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, CandidateSummary>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        items_statement = items_statement.bind(per_page).bind(offset);
        let items = items_statement.fetch_all(&self.pool).await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(CandidateList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Moves a candidate to another stage of the owning manager's pipeline.
    /// REJECT stages demand an active rejection reason; moving anywhere
    /// else clears the stored reason. The stage write, the notification and
    /// the audit entry commit together.
    pub async fn move_to_stage(
        &self,
        pipeline: &PipelineService,
        actor_id: i64,
        actor_role: &str,
        candidate_id: i64,
        payload: MoveStagePayload,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<Candidate> {
        let candidate = self.get(candidate_id).await?;
        if actor_role != "admin" && candidate.owning_manager_id != actor_id {
            return Err(Error::Forbidden(
                "Candidate belongs to another manager".to_string(),
            ));
        }

        let stages = pipeline.resolve(candidate.owning_manager_id).await?;
        let target = stages
            .iter()
            .find(|s| s.id == payload.stage_id)
            .ok_or_else(|| Error::BadRequest("Target stage is not in the pipeline".to_string()))?
            .clone();
        let target_status = StageStatus::from_code(&target.status);

        let rejection_reason_id = if target_status == StageStatus::Reject {
            let reason_id = payload.rejection_reason_id.ok_or_else(|| {
                Error::BadRequest("Rejection reason is required for this stage".to_string())
            })?;
            let known: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM rejection_reasons WHERE id = ? AND is_active = TRUE",
            )
            .bind(reason_id)
            .fetch_one(&self.pool)
            .await?;
            if known == 0 {
                return Err(Error::BadRequest(
                    "Unknown or inactive rejection reason".to_string(),
                ));
            }
            Some(reason_id)
        } else {
            None
        };

        let old_stage_name: String =
            sqlx::query_scalar("SELECT name FROM selection_stages WHERE id = ?")
                .bind(candidate.current_stage_id)
                .fetch_one(&self.pool)
                .await?;
        let vacancy_title: String = sqlx::query_scalar("SELECT title FROM vacancies WHERE id = ?")
            .bind(candidate.vacancy_id)
            .fetch_one(&self.pool)
            .await?;

        let update_query = format!(
            "UPDATE candidates
             SET current_stage_id = ?, rejection_reason_id = ?,
                 hr_comment = COALESCE(?, hr_comment), updated_at = ?
             WHERE id = ?
             RETURNING {}",
            CANDIDATE_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, Candidate>(&update_query)
            .bind(target.id)
            .bind(rejection_reason_id)
            .bind(&payload.comment)
            .bind(time::now())
            .bind(candidate_id)
            .fetch_one(&mut *tx)
            .await?;

        let kind = kind_for_transition(target_status, &target.name);
        insert_notification(
            &mut tx,
            candidate_id,
            kind,
            &message_for(kind, &vacancy_title, &target.name),
        )
        .await?;
        insert_audit(
            &mut tx,
            Some(actor_id),
            "candidate_stage_changed",
            "candidate",
            candidate_id,
            serde_json::json!({
                "from_stage": old_stage_name,
                "to_stage": target.name,
                "rejection_reason_id": rejection_reason_id,
            }),
            ip.as_deref(),
            user_agent.as_deref(),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Candidate {} moved from '{}' to '{}'",
            candidate_id,
            old_stage_name,
            target.name
        );
        Ok(updated)
    }

    pub async fn attach_resume(&self, candidate_id: i64, path: &str) -> Result<()> {
        sqlx::query("UPDATE candidates SET resume_path = ?, updated_at = ? WHERE id = ?")
            .bind(path)
            .bind(time::now())
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Stores cleaned resume text plus the contact sheet pulled out of it.
    pub async fn record_extracted_text(&self, candidate_id: i64, raw_text: &str) -> Result<()> {
        let cleaned = clean_extracted_text(raw_text);
        let contacts = extract_contacts(&cleaned);
        let resume_data = serde_json::json!({
            "emails": contacts.emails,
            "phones": contacts.phones,
            "links": contacts.links,
        });
        sqlx::query(
            "UPDATE candidates SET resume_text = ?, resume_data = ?, updated_at = ? WHERE id = ?",
        )
        .bind(cleaned)
        .bind(resume_data)
        .bind(time::now())
        .bind(candidate_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_hr_comment(&self, candidate_id: i64, comment: &str) -> Result<Candidate> {
        self.get(candidate_id).await?;
        let query = format!(
            "UPDATE candidates SET hr_comment = ?, updated_at = ? WHERE id = ? RETURNING {}",
            CANDIDATE_COLUMNS
        );
        let candidate = sqlx::query_as::<_, Candidate>(&query)
            .bind(comment)
            .bind(time::now())
            .bind(candidate_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(candidate)
    }
}

async fn insert_notification(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    candidate_id: i64,
    kind: &str,
    message: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO notifications (candidate_id, kind, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(candidate_id)
    .bind(kind)
    .bind(message)
    .bind(time::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn insert_audit(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: Option<i64>,
    action: &str,
    entity_type: &str,
    entity_id: i64,
    changes: JsonValue,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO audit_logs (user_id, action, entity_type, entity_id, changes, ip_address, user_agent, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(changes)
    .bind(ip)
    .bind(user_agent)
    .bind(time::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
