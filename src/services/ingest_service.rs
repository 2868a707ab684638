use crate::error::{Error, Result};
use crate::models::ingest_job::IngestJob;
use crate::services::ai_service::AIService;
use crate::services::audit_service::AuditService;
use crate::services::candidate_service::CandidateService;
use crate::services::notification_service::NotificationService;
use crate::utils::time;
use sqlx::SqlitePool;
use tokio::fs;
use tokio::process::Command;
use uuid::Uuid;

/// Extracted text shorter than this is treated as a failed extraction
/// (scanned document) and re-run through OCR.
const MIN_EXTRACT_CHARS: usize = 100;

const JOB_COLUMNS: &str = "id, candidate_id, status, attempts, max_attempts, error, \
                           next_retry_at, created_at, started_at, finished_at";

#[derive(Clone)]
pub struct IngestService {
    pool: SqlitePool,
    candidates: CandidateService,
    ai: AIService,
    notifications: NotificationService,
    audit: AuditService,
}

impl IngestService {
    pub fn new(
        pool: SqlitePool,
        candidates: CandidateService,
        ai: AIService,
        notifications: NotificationService,
        audit: AuditService,
    ) -> Self {
        Self {
            pool,
            candidates,
            ai,
            notifications,
            audit,
        }
    }

    /// Queues resume processing for a candidate. Idempotent: an already
    /// queued or running job for the same candidate is returned as-is.
    pub async fn enqueue(&self, candidate_id: i64) -> Result<IngestJob> {
        let existing_query = format!(
            "SELECT {} FROM ingest_jobs
             WHERE candidate_id = ? AND status IN ('pending', 'running')
             ORDER BY created_at DESC LIMIT 1",
            JOB_COLUMNS
        );
        if let Some(existing) = sqlx::query_as::<_, IngestJob>(&existing_query)
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(existing);
        }

        let insert_query = format!(
            "INSERT INTO ingest_jobs (candidate_id, status, created_at)
             VALUES (?, 'pending', ?)
             RETURNING {}",
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, IngestJob>(&insert_query)
            .bind(candidate_id)
            .bind(time::now())
            .fetch_one(&self.pool)
            .await?;
        tracing::info!("Queued resume ingestion for candidate {}", candidate_id);
        Ok(job)
    }

    pub async fn latest_for_candidate(&self, candidate_id: i64) -> Result<Option<IngestJob>> {
        let query = format!(
            "SELECT {} FROM ingest_jobs WHERE candidate_id = ? ORDER BY created_at DESC LIMIT 1",
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, IngestJob>(&query)
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Claims the oldest due job and runs extraction plus scoring for it.
    /// Returns false when the queue is empty. The claim flips the job to
    /// running and bumps attempts in a single statement, so concurrent
    /// workers cannot double-process.
    pub async fn run_once(&self) -> Result<bool> {
        let claim_query = format!(
            "UPDATE ingest_jobs
             SET status = 'running', attempts = attempts + 1, started_at = ?
             WHERE id = (
                 SELECT id FROM ingest_jobs
                 WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= ?)
                 ORDER BY created_at ASC
                 LIMIT 1
             )
             RETURNING {}",
            JOB_COLUMNS
        );
        let job_opt = sqlx::query_as::<_, IngestJob>(&claim_query)
            .bind(time::now())
            .bind(time::now())
            .fetch_optional(&self.pool)
            .await?;

        let Some(job) = job_opt else { return Ok(false) };

        match self.process(&job).await {
            Ok(()) => {
                sqlx::query(
                    "UPDATE ingest_jobs SET status = 'succeeded', error = NULL, finished_at = ?
                     WHERE id = ?",
                )
                .bind(time::now())
                .bind(job.id)
                .execute(&self.pool)
                .await?;
                tracing::info!(
                    "Resume ingestion finished for candidate {} (job {})",
                    job.candidate_id,
                    job.id
                );
            }
            Err(err) => self.handle_failure(&job, err).await?,
        }

        Ok(true)
    }

    async fn process(&self, job: &IngestJob) -> Result<()> {
        let candidate = self.candidates.get(job.candidate_id).await?;
        let path = candidate
            .resume_path
            .clone()
            .ok_or_else(|| Error::BadRequest("Candidate has no resume file".to_string()))?;

        let raw_text = self.extract_text(&path).await?;
        self.candidates
            .record_extracted_text(job.candidate_id, &raw_text)
            .await?;

        match self.ai.analyze_candidate(job.candidate_id).await {
            Ok(Some(_)) => {}
            Ok(None) => tracing::warn!(
                "Extraction succeeded for candidate {}, analysis unavailable",
                job.candidate_id
            ),
            Err(err) => tracing::warn!(
                "Extraction succeeded for candidate {}, analysis unavailable: {}",
                job.candidate_id,
                err
            ),
        }
        Ok(())
    }

    async fn extract_text(&self, path: &str) -> Result<String> {
        let ext = std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "pdf" => self.ai.ocr_pdf(path).await,
            "doc" | "docx" => {
                let text = office_to_text(path).await.unwrap_or_default();
                if text.trim().chars().count() >= MIN_EXTRACT_CHARS {
                    return Ok(text);
                }
                tracing::info!("Sparse text from {}, switching to OCR", path);
                self.ai.ocr_file(path).await
            }
            "jpg" | "jpeg" | "png" => self.ai.ocr_file(path).await,
            _ => Err(Error::BadRequest(format!(
                "Unsupported resume format '{}'",
                ext
            ))),
        }
    }

    async fn handle_failure(&self, job: &IngestJob, err: Error) -> Result<()> {
        let message = err.to_string();
        if job.attempts < job.max_attempts {
            let retry_at = time::now() + time::retry_backoff(job.attempts);
            sqlx::query(
                "UPDATE ingest_jobs SET status = 'pending', error = ?, next_retry_at = ?
                 WHERE id = ?",
            )
            .bind(&message)
            .bind(retry_at)
            .bind(job.id)
            .execute(&self.pool)
            .await?;
            tracing::warn!(
                "Resume ingestion for candidate {} failed (attempt {}/{}): {}",
                job.candidate_id,
                job.attempts,
                job.max_attempts,
                message
            );
            return Ok(());
        }

        sqlx::query("UPDATE ingest_jobs SET status = 'failed', error = ?, finished_at = ? WHERE id = ?")
            .bind(&message)
            .bind(time::now())
            .bind(job.id)
            .execute(&self.pool)
            .await?;
        tracing::error!(
            "Resume ingestion for candidate {} abandoned after {} attempts: {}",
            job.candidate_id,
            job.attempts,
            message
        );
        self.audit
            .log(
                None,
                "ingest_failed",
                "candidate",
                job.candidate_id,
                Some(serde_json::json!({ "error": message, "attempts": job.attempts })),
                None,
                None,
            )
            .await?;

        match self.candidates.get(job.candidate_id).await {
            Ok(candidate) => {
                let body = format!(
                    "Не удалось обработать резюме кандидата {} (ID {}). Ошибка: {}",
                    candidate.full_name, candidate.id, message
                );
                if let Err(alert_err) = self
                    .notifications
                    .send_manager_alert(
                        candidate.owning_manager_id,
                        "Ошибка обработки резюме",
                        &body,
                    )
                    .await
                {
                    tracing::warn!(
                        "Manager alert for candidate {} failed: {}",
                        job.candidate_id,
                        alert_err
                    );
                }
            }
            Err(err) => tracing::warn!(
                "Could not load candidate {} for manager alert: {}",
                job.candidate_id,
                err
            ),
        }
        Ok(())
    }
}

async fn office_to_text(path: &str) -> Result<String> {
    let temp_dir = format!("/tmp/resume_totxt_{}", Uuid::new_v4());
    fs::create_dir_all(&temp_dir).await?;

    let output = Command::new("libreoffice")
        .arg("--headless")
        .arg("--norestore")
        .arg("--convert-to")
        .arg("txt")
        .arg("--outdir")
        .arg(&temp_dir)
        .arg(path)
        .output()
        .await;

    match output {
        Ok(out) => {
            if !out.status.success() {
                let _ = fs::remove_dir_all(&temp_dir).await;
                return Err(anyhow::anyhow!(
                    "LibreOffice text conversion failed: {}",
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

    let mut text = None;
    let mut entries = fs::read_dir(&temp_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let p = entry.path();
        if p.extension().and_then(|e| e.to_str()) == Some("txt") {
            text = Some(fs::read_to_string(&p).await?);
            break;
        }
    }
    let _ = fs::remove_dir_all(&temp_dir).await;
    text.ok_or_else(|| anyhow::anyhow!("LibreOffice produced no text output").into())
}
