use crate::dto::vacancy_dto::{CreateVacancyPayload, UpdateVacancyPayload, VacancyListQuery};
use crate::error::{Error, Result};
use crate::models::vacancy::{Question, QuestionKind, Vacancy};
use crate::utils::time;
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use std::collections::HashSet;

#[derive(Clone)]
pub struct VacancyService {
    pool: SqlitePool,
}

pub struct VacancyList {
    pub items: Vec<Vacancy>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl VacancyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, created_by: i64, payload: CreateVacancyPayload) -> Result<Vacancy> {
        let questions = prepare_question_set(payload.questions)?;
        let soft_questions = prepare_question_set(payload.soft_questions)?;

        let now = time::now();
        let vacancy = sqlx::query_as::<_, Vacancy>(
            "INSERT INTO vacancies (
                title, employment_type, description_tasks, description_conditions,
                ideal_profile, questions, soft_questions, is_active, created_by,
                ai_metadata, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, TRUE, ?, ?, ?, ?)
            RETURNING id, title, employment_type, description_tasks, description_conditions,
                      ideal_profile, questions, soft_questions, is_active, created_by,
                      ai_metadata, created_at, updated_at",
        )
        .bind(payload.title)
        .bind(payload.employment_type)
        .bind(payload.description_tasks)
        .bind(payload.description_conditions)
        .bind(payload.ideal_profile)
        .bind(questions)
        .bind(soft_questions)
        .bind(created_by)
        .bind(payload.ai_metadata)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(vacancy)
    }

    pub async fn update(&self, id: i64, payload: UpdateVacancyPayload) -> Result<Vacancy> {
        self.get_by_id(id).await?;

        let questions = payload
            .questions
            .map(|qs| prepare_question_set(Some(qs)))
            .transpose()?;
        let soft_questions = payload
            .soft_questions
            .map(|qs| prepare_question_set(Some(qs)))
            .transpose()?;

        let vacancy = sqlx::query_as::<_, Vacancy>(
            "UPDATE vacancies
             SET title = COALESCE(?, title),
                 employment_type = COALESCE(?, employment_type),
                 description_tasks = COALESCE(?, description_tasks),
                 description_conditions = COALESCE(?, description_conditions),
                 ideal_profile = COALESCE(?, ideal_profile),
                 questions = COALESCE(?, questions),
                 soft_questions = COALESCE(?, soft_questions),
                 is_active = COALESCE(?, is_active),
                 ai_metadata = COALESCE(?, ai_metadata),
                 updated_at = ?
             WHERE id = ?
             RETURNING id, title, employment_type, description_tasks, description_conditions,
                       ideal_profile, questions, soft_questions, is_active, created_by,
                       ai_metadata, created_at, updated_at",
        )
        .bind(payload.title)
        .bind(payload.employment_type)
        .bind(payload.description_tasks)
        .bind(payload.description_conditions)
        .bind(payload.ideal_profile)
        .bind(questions)
        .bind(soft_questions)
        .bind(payload.is_active)
        .bind(payload.ai_metadata)
        .bind(time::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(vacancy)
    }

    pub async fn list(&self, query: VacancyListQuery) -> Result<VacancyList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if !query.include_archived.unwrap_or(false) {
            filters.push("is_active = TRUE".to_string());
        }
        if let Some(search) = query.search {
            filters.push("title LIKE ?".to_string());
            args.push(format!("%{}%", search));
        }

        let where_clause = if filters.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };

        let items_query = format!(
            "SELECT id, title, employment_type, description_tasks, description_conditions,
                    ideal_profile, questions, soft_questions, is_active, created_by,
                    ai_metadata, created_at, updated_at
             FROM vacancies
             {}
             ORDER BY created_at DESC
             LIMIT ? OFFSET ?",
            where_clause
        );
        let total_query = format!("SELECT COUNT(*) FROM vacancies {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, Vacancy>(&items_query);
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

        Ok(VacancyList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Vacancy> {
        let vacancy = sqlx::query_as::<_, Vacancy>(
            "SELECT id, title, employment_type, description_tasks, description_conditions,
                    ideal_profile, questions, soft_questions, is_active, created_by,
                    ai_metadata, created_at, updated_at
             FROM vacancies
             WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(vacancy)
    }

    /// Published view: archived vacancies are invisible to applicants.
    pub async fn get_active(&self, id: i64) -> Result<Vacancy> {
        let vacancy = sqlx::query_as::<_, Vacancy>(
            "SELECT id, title, employment_type, description_tasks, description_conditions,
                    ideal_profile, questions, soft_questions, is_active, created_by,
                    ai_metadata, created_at, updated_at
             FROM vacancies
             WHERE id = ? AND is_active = TRUE",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(vacancy)
    }

    pub async fn list_active(&self, limit: i64) -> Result<Vec<Vacancy>> {
        let limit = if limit <= 0 { 20 } else { limit.min(100) };
        let items = sqlx::query_as::<_, Vacancy>(
            "SELECT id, title, employment_type, description_tasks, description_conditions,
                    ideal_profile, questions, soft_questions, is_active, created_by,
                    ai_metadata, created_at, updated_at
             FROM vacancies
             WHERE is_active = TRUE
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn archive(&self, id: i64) -> Result<Vacancy> {
        self.get_by_id(id).await?;
        let vacancy = sqlx::query_as::<_, Vacancy>(
            "UPDATE vacancies SET is_active = FALSE, updated_at = ? WHERE id = ?
             RETURNING id, title, employment_type, description_tasks, description_conditions,
                       ideal_profile, questions, soft_questions, is_active, created_by,
                       ai_metadata, created_at, updated_at",
        )
        .bind(time::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(vacancy)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.get_by_id(id).await?;
        let in_use: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE vacancy_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if in_use > 0 {
            return Err(Error::Conflict(
                "Vacancy has candidates and can only be archived".to_string(),
            ));
        }
        sqlx::query("DELETE FROM vacancies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Normalizes an optional question list to the stored JSON array, rejecting
/// malformed question definitions.
fn prepare_question_set(questions: Option<Vec<Question>>) -> Result<JsonValue> {
    let Some(questions) = questions else {
        return Ok(JsonValue::Array(Vec::new()));
    };
    let mut seen = HashSet::new();
    for question in &questions {
        if question.id.trim().is_empty() {
            return Err(Error::BadRequest("Question id cannot be empty".to_string()));
        }
        if !seen.insert(question.id.as_str()) {
            return Err(Error::BadRequest(format!(
                "Duplicate question id '{}'",
                question.id
            )));
        }
        if question.text.trim().is_empty() {
            return Err(Error::BadRequest(format!(
                "Question '{}' has no text",
                question.id
            )));
        }
        if question.kind == QuestionKind::Choice && question.options.is_empty() {
            return Err(Error::BadRequest(format!(
                "Choice question '{}' has no options",
                question.id
            )));
        }
    }
    Ok(serde_json::to_value(questions)?)
}
