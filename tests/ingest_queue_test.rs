mod common;

use chrono::{Duration, Utc};
use hiring_backend::dto::public_dto::SubmitApplicationPayload;
use hiring_backend::dto::vacancy_dto::CreateVacancyPayload;

#[tokio::test]
async fn ingest_jobs_retry_and_give_up() {
    let state = common::setup().await;
    let manager_id = common::seed_user(&state, "manager@example.com", "hr").await;

    let vacancy = state
        .vacancy_service
        .create(
            manager_id,
            CreateVacancyPayload {
                title: "Site Reliability Engineer".to_string(),
                employment_type: None,
                description_tasks: None,
                description_conditions: None,
                ideal_profile: None,
                questions: None,
                soft_questions: None,
                ai_metadata: None,
            },
        )
        .await
        .unwrap();

    let started = Utc::now();
    let candidate = state
        .candidate_service
        .submit(
            &state.pipeline_service,
            SubmitApplicationPayload {
                vacancy_id: vacancy.id,
                full_name: "Queueing Candidate".to_string(),
                email: "queue@example.com".to_string(),
                phone: "+99312000001".to_string(),
                education: "higher".to_string(),
                experience_years: 2,
                city: None,
                vacancy_answers: None,
                soft_answers: None,
                cover_letter: None,
            },
            None,
            None,
        )
        .await
        .unwrap();

    // The resume points nowhere, so every processing attempt will fail.
    let missing_path = format!(
        "{}/resume_{}.pdf",
        hiring_backend::config::get_config().uploads_dir,
        candidate.tracking_code
    );
    state
        .candidate_service
        .attach_resume(candidate.id, &missing_path)
        .await
        .unwrap();

    let job = state.ingest_service.enqueue(candidate.id).await.unwrap();
    assert_eq!(job.status, "pending");
    assert_eq!(job.attempts, 0);
    assert_eq!(job.max_attempts, 3);

    // Queueing twice while pending hands back the same job.
    let again = state.ingest_service.enqueue(candidate.id).await.unwrap();
    assert_eq!(again.id, job.id);

    // First attempt fails and schedules a retry in the future.
    assert!(state.ingest_service.run_once().await.unwrap());
    let job = state
        .ingest_service
        .latest_for_candidate(candidate.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, "pending");
    assert_eq!(job.attempts, 1);
    assert!(job.error.is_some());
    assert!(job.started_at.is_some());
    assert!(job.next_retry_at.unwrap() > started);

    // Not due yet, so the worker finds nothing to do.
    assert!(!state.ingest_service.run_once().await.unwrap());

    // Fast-forward to the last allowed attempt.
    sqlx::query("UPDATE ingest_jobs SET attempts = 2, next_retry_at = ? WHERE id = ?")
        .bind(Utc::now() - Duration::minutes(5))
        .bind(job.id)
        .execute(&state.pool)
        .await
        .unwrap();

    assert!(state.ingest_service.run_once().await.unwrap());
    let job = state
        .ingest_service
        .latest_for_candidate(candidate.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, "failed");
    assert_eq!(job.attempts, 3);
    assert!(job.finished_at.is_some());

    let audit_rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_logs
         WHERE action = 'ingest_failed' AND entity_type = 'candidate' AND entity_id = ?",
    )
    .bind(candidate.id)
    .fetch_one(&state.pool)
    .await
    .unwrap();
    assert_eq!(audit_rows, 1);

    // A terminal job no longer blocks re-queueing.
    let fresh = state.ingest_service.enqueue(candidate.id).await.unwrap();
    assert_ne!(fresh.id, job.id);
    assert_eq!(fresh.status, "pending");

    // The submission parked one outbox notification. Without a mail
    // gateway the delivery worker leaves it untouched.
    let feed = state
        .notification_service
        .list_for_candidate(candidate.id)
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].kind, "application_received");
    assert!(!feed[0].email_sent);

    assert!(!state.notification_service.run_once().await.unwrap());
    let attempts: i64 =
        sqlx::query_scalar("SELECT attempts FROM notifications WHERE candidate_id = ?")
            .bind(candidate.id)
            .fetch_one(&state.pool)
            .await
            .unwrap();
    assert_eq!(attempts, 0);
}
