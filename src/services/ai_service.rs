use crate::dto::vacancy_dto::{GenerateDescriptionPayload, GeneratedDescriptionResponse};
use crate::error::{Error, Result};
use crate::models::candidate::Candidate;
use crate::models::vacancy::{Question, Vacancy};
use crate::utils::time;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use uuid::Uuid;

const MODEL: &str = "gpt-4o";
const MAX_PROMPT_RESUME_CHARS: usize = 15_000;
const MAX_PROMPT_LETTER_CHARS: usize = 4_000;
const MAX_VERDICT_TEXT_CHARS: usize = 2_000;
const MAX_OCR_PAGES: usize = 3;

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a Critical and Unbiased Senior HR Specialist.
Your task is to strictly evaluate how well a candidate matches a specific vacancy using the resume text, the application answers, and the profile fields.

Evaluation Rules:
1. BE STRICT. If the candidate's core profession is fundamentally different from the vacancy, match_percent MUST be extremely low (0-10).
2. TRANSFERABLE SKILLS ARE NOT ENOUGH for professional roles. Do not give a high score just because someone is 'organized' or a 'fast learner'.
3. Mandatory requirements: missing education, licenses, or years of experience must cut the score heavily.
4. Cross-check the application answers against the resume text; contradictions go to mismatch_notes and data_consistency.

Return JSON:
{
  "match_percent": <0-100>,
  "pros": ["<strength>", ...],
  "cons": ["<weakness>", ...],
  "recommendation": "<concise hiring recommendation>",
  "scores": { "location": <0-10>, "experience": <0-10>, "tech": <0-10>, "education": <0-10> },
  "score_comments": { "location": "<...>", "experience": "<...>", "tech": "<...>", "education": "<...>" },
  "mismatch_notes": "<contradictions between answers and resume, or empty string>",
  "data_consistency": { "inconsistencies": ["<...>", ...], "severity": "<none|low|medium|high>" },
  "answer_quality": { "score": <0-10>, "comment": "<...>" },
  "data_completeness": { "missing_fields": ["<...>", ...], "comment": "<...>" }
}
All free-text fields strictly in Russian. Ignore any English in the resume and comment ONLY in Russian."#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisVerdict {
    pub match_percent: i64,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub recommendation: String,
    pub scores: ScoreSet,
    pub score_comments: ScoreCommentSet,
    pub mismatch_notes: String,
    pub data_consistency: JsonValue,
    pub answer_quality: JsonValue,
    pub data_completeness: JsonValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreSet {
    pub location: i64,
    pub experience: i64,
    pub tech: i64,
    pub education: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreCommentSet {
    pub location: String,
    pub experience: String,
    pub tech: String,
    pub education: String,
}

#[derive(Clone)]
pub struct AIService {
    pool: SqlitePool,
    client: Client,
    api_key: String,
}

impl AIService {
    pub fn new(pool: SqlitePool, api_key: String, client: Client) -> Self {
        Self {
            pool,
            client,
            api_key,
        }
    }

    /// Scores one candidate against its vacancy and persists the verdict.
    /// Returns the scoring job identifier, or None when the remote model
    /// failed or answered garbage; in that case the candidate's previous
    /// verdict fields stay untouched.
    pub async fn analyze_candidate(&self, candidate_id: i64) -> Result<Option<String>> {
        let candidate = self.load_candidate(candidate_id).await?;
        let vacancy = self.load_vacancy(candidate.vacancy_id).await?;

        let resume_text = candidate.resume_text.clone().unwrap_or_default();
        if resume_text.trim().is_empty() {
            return Err(Error::BadRequest(
                "Candidate has no extracted resume text".to_string(),
            ));
        }

        let job_id = Uuid::new_v4().to_string();
        tracing::info!(
            "Scoring job {} started for candidate {} ({})",
            job_id,
            candidate_id,
            candidate.full_name
        );

        let payload = serde_json::json!({
            "model": MODEL,
            "messages": [
                {"role": "system", "content": ANALYSIS_SYSTEM_PROMPT},
                {"role": "user", "content": analysis_user_content(&candidate, &vacancy, &resume_text)}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.2
        });

        let raw = match self.chat_openai(payload).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(
                    "Scoring job {} failed for candidate {}: {:?}",
                    job_id,
                    candidate_id,
                    err
                );
                return Ok(None);
            }
        };
        let verdict = match serde_json::from_value::<AnalysisVerdict>(raw) {
            Ok(verdict) => normalize_verdict(verdict),
            Err(err) => {
                tracing::error!(
                    "Scoring job {} returned a malformed verdict for candidate {}: {}",
                    job_id,
                    candidate_id,
                    err
                );
                return Ok(None);
            }
        };

        self.persist_verdict(candidate_id, &verdict).await?;
        tracing::info!(
            "Scoring job {} stored verdict for candidate {}: match {}%",
            job_id,
            candidate_id,
            verdict.match_percent
        );
        Ok(Some(job_id))
    }

    pub async fn generate_vacancy_description(
        &self,
        payload: &GenerateDescriptionPayload,
    ) -> Result<GeneratedDescriptionResponse> {
        let system_prompt = "You are an expert HR Copywriter. Draft a vacancy in RUSSIAN language (strictly, even if the user context is in another language). \
            Return a JSON object with fields 'description_tasks' (what the person will do), \
            'description_conditions' (what the company offers) and 'ideal_profile' \
            (the background a perfect candidate has). Clear structure, professional tone.";

        let user_data = serde_json::json!({
            "title": payload.title,
            "notes": payload.notes,
        });

        let ai_payload = serde_json::json!({
            "model": MODEL,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_data.to_string()}
            ],
            "response_format": { "type": "json_object" }
        });

        match self.chat_openai(ai_payload).await {
            Ok(resp) => {
                let tasks = resp.get("description_tasks").and_then(|v| v.as_str());
                let conditions = resp.get("description_conditions").and_then(|v| v.as_str());
                let profile = resp.get("ideal_profile").and_then(|v| v.as_str());
                if let (Some(tasks), Some(conditions), Some(profile)) = (tasks, conditions, profile)
                {
                    return Ok(GeneratedDescriptionResponse {
                        description_tasks: tasks.trim().to_string(),
                        description_conditions: conditions.trim().to_string(),
                        ideal_profile: profile.trim().to_string(),
                        ai_metadata: serde_json::json!({
                            "model": MODEL,
                            "generated_at": time::to_rfc3339(time::now()),
                            "source": "openai",
                        }),
                    });
                }
                tracing::error!("Vacancy generation answer missed required fields");
            }
            Err(err) => tracing::error!("Vacancy generation failed: {:?}", err),
        }

        Ok(fallback_vacancy_description(payload))
    }

    /// Rasterizes a PDF and transcribes it page by page, one vision call
    /// per page, keeping page order in the concatenated result.
    pub async fn ocr_pdf(&self, file_path: &str) -> Result<String> {
        let images = self.pdf_to_images(file_path).await?;
        if images.is_empty() {
            return Err(anyhow::anyhow!("No pages could be rasterized from {}", file_path).into());
        }
        let mut pages = Vec::new();
        for (i, image) in images.iter().take(MAX_OCR_PAGES).enumerate() {
            tracing::info!("Transcribing page {} of {}", i + 1, file_path);
            pages.push(self.ocr_images(std::slice::from_ref(image)).await?);
        }
        Ok(pages.join("\n\n"))
    }

    /// Transcribes a whole resume document in a single vision call. Used
    /// for image uploads and as the fallback for office documents whose
    /// structural parse came back empty.
    pub async fn ocr_file(&self, file_path: &str) -> Result<String> {
        let images = self.extract_images(file_path).await?;
        if images.is_empty() {
            return Err(anyhow::anyhow!("No images could be extracted from {}", file_path).into());
        }
        let end = images.len().min(MAX_OCR_PAGES);
        self.ocr_images(&images[..end]).await
    }

    async fn ocr_images(&self, images: &[String]) -> Result<String> {
        let mut content: Vec<JsonValue> = vec![serde_json::json!({
            "type": "text",
            "text": "Перед тобой страницы резюме. Перепиши весь текст с изображений дословно, без комментариев и перевода. Верни JSON: { \"text\": \"<полный текст резюме>\" }."
        })];
        for image_base64 in images {
            content.push(serde_json::json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:image/png;base64,{}", image_base64),
                    "detail": "high"
                }
            }));
        }

        let payload = serde_json::json!({
            "model": MODEL,
            "messages": [
                {"role": "user", "content": content}
            ],
            "response_format": { "type": "json_object" },
            "max_tokens": 4000
        });

        let resp = self.chat_openai(payload).await?;
        let text = resp
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(text)
    }

    async fn extract_images(&self, file_path: &str) -> Result<Vec<String>> {
        let path = std::path::Path::new(file_path);
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "pdf" => self.pdf_to_images(file_path).await,
            "jpg" | "jpeg" | "png" => {
                let data = fs::read(file_path).await?;
                Ok(vec![BASE64.encode(&data)])
            }
            "doc" | "docx" => {
                let temp_dir = format!("/tmp/resume_topdf_{}", Uuid::new_v4());
                fs::create_dir_all(&temp_dir).await?;

                let output = Command::new("libreoffice")
                    .arg("--headless")
                    .arg("--norestore")
                    .arg("--convert-to")
                    .arg("pdf")
                    .arg("--outdir")
                    .arg(&temp_dir)
                    .arg(file_path)
                    .output()
                    .await;

                match output {
                    Ok(out) => {
                        if !out.status.success() {
                            let _ = fs::remove_dir_all(&temp_dir).await;
                            return Err(anyhow::anyhow!(
                                "LibreOffice PDF conversion failed: {}",
                                String::from_utf8_lossy(&out.stderr)
                            )
                            .into());
                        }
                    }
                    Err(e) => {
                        let _ = fs::remove_dir_all(&temp_dir).await;
                        return Err(anyhow::anyhow!("Failed to run libreoffice: {}", e).into());
                    }
                }

                let mut pdf_path = None;
                let mut entries = fs::read_dir(&temp_dir).await?;
                while let Some(entry) = entries.next_entry().await? {
                    let p = entry.path();
                    if p.extension().and_then(|e| e.to_str()) == Some("pdf") {
                        pdf_path = Some(p);
                        break;
                    }
                }

                let result = if let Some(pdf) = pdf_path {
                    self.pdf_to_images(pdf.to_str().unwrap_or("")).await
                } else {
                    Err(anyhow::anyhow!("LibreOffice produced no PDF output").into())
                };

                let _ = fs::remove_dir_all(&temp_dir).await;
                result
            }
            _ => Err(anyhow::anyhow!("Unsupported file format for OCR: {}", ext).into()),
        }
    }

    async fn pdf_to_images(&self, pdf_path: &str) -> Result<Vec<String>> {
        let temp_dir = format!("/tmp/resume_images_{}", Uuid::new_v4());
        fs::create_dir_all(&temp_dir).await?;

        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg("150")
            .arg(pdf_path)
            .arg(format!("{}/page", temp_dir))
            .output()
            .await;

        match output {
            Ok(out) => {
                if !out.status.success() {
                    tracing::error!("pdftoppm failed: {}", String::from_utf8_lossy(&out.stderr));
                    let _ = fs::remove_dir_all(&temp_dir).await;
                    return Err(anyhow::anyhow!("PDF conversion failed").into());
                }
            }
            Err(e) => {
                tracing::error!("Failed to run pdftoppm: {}", e);
                let _ = fs::remove_dir_all(&temp_dir).await;
                return Err(anyhow::anyhow!("pdftoppm not available").into());
            }
        }

        let mut image_files = Vec::new();
        let mut entries = fs::read_dir(&temp_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            if entry_path.extension().and_then(|e| e.to_str()) == Some("png") {
                image_files.push(entry_path);
            }
        }
        image_files.sort_by_key(|p| p.file_name().and_then(|n| n.to_str()).unwrap_or("").to_string());

        let mut images = Vec::new();
        for img_path in image_files {
            if let Ok(data) = fs::read(&img_path).await {
                images.push(BASE64.encode(&data));
            }
        }

        let _ = fs::remove_dir_all(&temp_dir).await;
        Ok(images)
    }

    async fn chat_openai(&self, payload: JsonValue) -> Result<JsonValue> {
        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("OpenAI API Error {}: {}", status, text).into());
        }

        let body: JsonValue = res.json().await?;

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str(s).ok())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response format").into())
    }

    async fn persist_verdict(&self, candidate_id: i64, verdict: &AnalysisVerdict) -> Result<()> {
        sqlx::query(
            "UPDATE candidates
             SET ai_match_percent = ?, ai_pros = ?, ai_cons = ?, ai_recommendation = ?,
                 ai_score_location = ?, ai_score_experience = ?, ai_score_tech = ?,
                 ai_score_education = ?, ai_score_comments_location = ?,
                 ai_score_comments_experience = ?, ai_score_comments_tech = ?,
                 ai_score_comments_education = ?, ai_mismatch_notes = ?,
                 ai_data_consistency = ?, ai_answer_quality = ?, ai_data_completeness = ?,
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(verdict.match_percent)
        .bind(verdict.pros.join("\n"))
        .bind(verdict.cons.join("\n"))
        .bind(&verdict.recommendation)
        .bind(verdict.scores.location)
        .bind(verdict.scores.experience)
        .bind(verdict.scores.tech)
        .bind(verdict.scores.education)
        .bind(&verdict.score_comments.location)
        .bind(&verdict.score_comments.experience)
        .bind(&verdict.score_comments.tech)
        .bind(&verdict.score_comments.education)
        .bind(&verdict.mismatch_notes)
        .bind(&verdict.data_consistency)
        .bind(&verdict.answer_quality)
        .bind(&verdict.data_completeness)
        .bind(time::now())
        .bind(candidate_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_candidate(&self, id: i64) -> Result<Candidate> {
        let candidate = sqlx::query_as::<_, Candidate>(
            "SELECT id, vacancy_id, owning_manager_id, current_stage_id, full_name,
                    email_encrypted, phone_encrypted, phone_index, base_answers,
                    vacancy_answers, soft_answers, cover_letter, resume_path, resume_text,
                    resume_data, ai_match_percent, ai_pros, ai_cons, ai_recommendation,
                    ai_score_location, ai_score_experience, ai_score_tech, ai_score_education,
                    ai_score_comments_location, ai_score_comments_experience,
                    ai_score_comments_tech, ai_score_comments_education, ai_mismatch_notes,
                    ai_data_consistency, ai_answer_quality, ai_data_completeness,
                    rejection_reason_id, tracking_code, hr_comment, created_at, updated_at
             FROM candidates WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(candidate)
    }

    async fn load_vacancy(&self, id: i64) -> Result<Vacancy> {
        let vacancy = sqlx::query_as::<_, Vacancy>(
            "SELECT id, title, employment_type, description_tasks, description_conditions,
                    ideal_profile, questions, soft_questions, is_active, created_by,
                    ai_metadata, created_at, updated_at
             FROM vacancies WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(vacancy)
    }
}

fn analysis_user_content(candidate: &Candidate, vacancy: &Vacancy, resume_text: &str) -> String {
    let mut sections = Vec::new();
    sections.push(format!("Вакансия: {}", vacancy.title));
    if let Some(tasks) = &vacancy.description_tasks {
        sections.push(format!("Задачи:\n{}", tasks));
    }
    if let Some(conditions) = &vacancy.description_conditions {
        sections.push(format!("Условия:\n{}", conditions));
    }
    if let Some(profile) = &vacancy.ideal_profile {
        sections.push(format!("Портрет идеального кандидата:\n{}", profile));
    }

    sections.push(format!("Кандидат: {}", candidate.full_name));
    if let Some(block) = render_map("Анкета кандидата", &candidate.base_answers) {
        sections.push(block);
    }
    let questions = vacancy.question_list().unwrap_or_default();
    if let Some(block) = render_answers(
        "Ответы на вопросы вакансии",
        &questions,
        &candidate.vacancy_answers,
    ) {
        sections.push(block);
    }
    let soft_questions = vacancy.soft_question_list().unwrap_or_default();
    if let Some(block) = render_answers(
        "Ответы на софт-вопросы",
        &soft_questions,
        &candidate.soft_answers,
    ) {
        sections.push(block);
    }
    if let Some(letter) = &candidate.cover_letter {
        sections.push(format!(
            "Сопроводительное письмо:\n{}",
            clip(letter, MAX_PROMPT_LETTER_CHARS)
        ));
    }
    sections.push(format!(
        "Текст резюме:\n{}",
        clip(resume_text, MAX_PROMPT_RESUME_CHARS)
    ));

    sections.join("\n\n")
}

/// Answer block with each answer paired to its question text, looked up by
/// question id. Unknown ids fall back to the raw key.
fn render_answers(
    heading: &str,
    questions: &[Question],
    answers: &Option<JsonValue>,
) -> Option<String> {
    let map = answers.as_ref()?.as_object()?;
    if map.is_empty() {
        return None;
    }
    let mut lines = Vec::new();
    for (key, value) in map {
        let text = questions
            .iter()
            .find(|q| &q.id == key)
            .map(|q| q.text.as_str())
            .unwrap_or(key.as_str());
        lines.push(format!("- {}: {}", text, render_value(value)));
    }
    Some(format!("{}:\n{}", heading, lines.join("\n")))
}

fn render_map(heading: &str, value: &Option<JsonValue>) -> Option<String> {
    let map = value.as_ref()?.as_object()?;
    if map.is_empty() {
        return None;
    }
    let lines: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("- {}: {}", key, render_value(value)))
        .collect();
    Some(format!("{}:\n{}", heading, lines.join("\n")))
}

fn render_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Clamps scores into range, truncates run-away text and guarantees the
/// quality blocks carry their sub-keys even when the model omitted them.
pub fn normalize_verdict(mut verdict: AnalysisVerdict) -> AnalysisVerdict {
    verdict.match_percent = verdict.match_percent.clamp(0, 100);
    verdict.scores.location = verdict.scores.location.clamp(0, 10);
    verdict.scores.experience = verdict.scores.experience.clamp(0, 10);
    verdict.scores.tech = verdict.scores.tech.clamp(0, 10);
    verdict.scores.education = verdict.scores.education.clamp(0, 10);

    verdict.pros = verdict
        .pros
        .into_iter()
        .map(|s| clip(&s, MAX_VERDICT_TEXT_CHARS))
        .collect();
    verdict.cons = verdict
        .cons
        .into_iter()
        .map(|s| clip(&s, MAX_VERDICT_TEXT_CHARS))
        .collect();
    verdict.recommendation = clip(&verdict.recommendation, MAX_VERDICT_TEXT_CHARS);
    verdict.mismatch_notes = clip(&verdict.mismatch_notes, MAX_VERDICT_TEXT_CHARS);
    verdict.score_comments.location = clip(&verdict.score_comments.location, MAX_VERDICT_TEXT_CHARS);
    verdict.score_comments.experience =
        clip(&verdict.score_comments.experience, MAX_VERDICT_TEXT_CHARS);
    verdict.score_comments.tech = clip(&verdict.score_comments.tech, MAX_VERDICT_TEXT_CHARS);
    verdict.score_comments.education =
        clip(&verdict.score_comments.education, MAX_VERDICT_TEXT_CHARS);

    verdict.data_consistency = normalize_consistency(verdict.data_consistency);
    verdict.answer_quality = normalize_answer_quality(verdict.answer_quality);
    verdict.data_completeness = normalize_completeness(verdict.data_completeness);
    verdict
}

fn normalize_consistency(value: JsonValue) -> JsonValue {
    let mut map = match value {
        JsonValue::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let inconsistencies = map
        .get("inconsistencies")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let severity = map
        .get("severity")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            if inconsistencies.is_empty() {
                "none".to_string()
            } else {
                "medium".to_string()
            }
        });
    map.insert(
        "inconsistencies".to_string(),
        JsonValue::Array(inconsistencies),
    );
    map.insert("severity".to_string(), JsonValue::String(severity));
    JsonValue::Object(map)
}

fn normalize_answer_quality(value: JsonValue) -> JsonValue {
    let mut map = match value {
        JsonValue::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let score = map
        .get("score")
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
        .clamp(0, 10);
    let comment = map
        .get("comment")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    map.insert("score".to_string(), JsonValue::from(score));
    map.insert("comment".to_string(), JsonValue::String(comment));
    JsonValue::Object(map)
}

fn normalize_completeness(value: JsonValue) -> JsonValue {
    let mut map = match value {
        JsonValue::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    let missing = map
        .get("missing_fields")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let comment = map
        .get("comment")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    map.insert("missing_fields".to_string(), JsonValue::Array(missing));
    map.insert("comment".to_string(), JsonValue::String(comment));
    JsonValue::Object(map)
}

fn clip(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

fn fallback_vacancy_description(payload: &GenerateDescriptionPayload) -> GeneratedDescriptionResponse {
    let notes = payload.notes.clone().unwrap_or_default();
    GeneratedDescriptionResponse {
        description_tasks: format!("Работа над задачами позиции '{}'. {}", payload.title, notes)
            .trim()
            .to_string(),
        description_conditions: "Условия обсуждаются с кандидатом индивидуально.".to_string(),
        ideal_profile: format!(
            "Специалист с профильным опытом для позиции '{}'.",
            payload.title
        ),
        ai_metadata: serde_json::json!({
            "model": MODEL,
            "generated_at": time::to_rfc3339(time::now()),
            "source": "fallback",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_scores_are_clamped() {
        let verdict: AnalysisVerdict = serde_json::from_value(json!({
            "match_percent": 250,
            "scores": { "location": -3, "experience": 14, "tech": 7, "education": 10 }
        }))
        .unwrap();
        let verdict = normalize_verdict(verdict);
        assert_eq!(verdict.match_percent, 100);
        assert_eq!(verdict.scores.location, 0);
        assert_eq!(verdict.scores.experience, 10);
        assert_eq!(verdict.scores.tech, 7);
    }

    #[test]
    fn quality_blocks_get_default_sub_keys() {
        let verdict = normalize_verdict(AnalysisVerdict::default());
        assert_eq!(verdict.data_consistency["inconsistencies"], json!([]));
        assert_eq!(verdict.data_consistency["severity"], json!("none"));
        assert_eq!(verdict.answer_quality["score"], json!(0));
        assert_eq!(verdict.data_completeness["missing_fields"], json!([]));
    }

    #[test]
    fn consistency_severity_defaults_from_findings() {
        let verdict: AnalysisVerdict = serde_json::from_value(json!({
            "match_percent": 50,
            "data_consistency": { "inconsistencies": ["Опыт в анкете не совпадает с резюме"] }
        }))
        .unwrap();
        let verdict = normalize_verdict(verdict);
        assert_eq!(verdict.data_consistency["severity"], json!("medium"));
    }

    #[test]
    fn answers_are_paired_with_question_text() {
        let questions: Vec<Question> = serde_json::from_value(json!([
            {"id": "q1", "text": "Какой у вас опыт с Rust?"}
        ]))
        .unwrap();
        let answers = Some(json!({"q1": "Три года", "q_unknown": 5}));
        let block = render_answers("Ответы", &questions, &answers).unwrap();
        assert!(block.contains("Какой у вас опыт с Rust?: Три года"));
        assert!(block.contains("q_unknown: 5"));
    }

    #[test]
    fn verdict_parses_from_partial_model_output() {
        let verdict: AnalysisVerdict = serde_json::from_value(json!({
            "match_percent": 82,
            "pros": ["Сильный опыт"],
            "recommendation": "Рекомендовать к собеседованию"
        }))
        .unwrap();
        let verdict = normalize_verdict(verdict);
        assert_eq!(verdict.match_percent, 82);
        assert_eq!(verdict.pros, vec!["Сильный опыт".to_string()]);
        assert!(verdict.cons.is_empty());
    }
}
