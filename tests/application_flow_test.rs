mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower::ServiceExt;

/// Full hiring flow: a manager customizes their pipeline, publishes a
/// vacancy, an applicant submits with a PDF resume, and the manager drives
/// the candidate to a terminal stage.
#[tokio::test]
async fn application_flow_end_to_end() {
    let state = common::setup().await;
    let admin_id = common::seed_user(&state, "admin@example.com", "admin").await;
    let token = common::token_for(admin_id, "admin");

    let admin_api = Router::new()
        .route(
            "/api/admin/stages",
            post(hiring_backend::routes::pipeline::create_stage),
        )
        .layer(axum::middleware::from_fn(
            hiring_backend::middleware::auth::require_admin,
        ))
        .with_state(state.clone());

    let mut stage_ids = Vec::new();
    for (name, status) in [
        ("Applied", "NEW"),
        ("Screening", "IN_PROGRESS"),
        ("Rejected", "REJECT"),
        ("Hired", "ACCEPT"),
    ] {
        let response = admin_api
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/admin/stages")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "name": name, "status": status }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = common::read_json(response).await;
        stage_ids.push(body["id"].as_i64().unwrap());
    }
    let applied_id = stage_ids[0];
    let rejected_id = stage_ids[2];
    let hired_id = stage_ids[3];

    let hr_api = Router::new()
        .route(
            "/api/hr/pipeline",
            put(hiring_backend::routes::pipeline::customize_pipeline),
        )
        .route(
            "/api/hr/vacancies",
            post(hiring_backend::routes::vacancy::create_vacancy),
        )
        .route(
            "/api/hr/candidates/:id",
            get(hiring_backend::routes::candidate_routes::get_candidate),
        )
        .route(
            "/api/hr/candidates/:id/stage",
            post(hiring_backend::routes::candidate_routes::move_candidate_stage),
        )
        .layer(axum::middleware::from_fn(
            hiring_backend::middleware::auth::require_hr_or_admin,
        ))
        .with_state(state.clone());

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/hr/pipeline")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "stage_ids": stage_ids }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["customized"], json!(true));
    assert_eq!(body["stages"][0]["name"], json!("Applied"));
    assert_eq!(body["stages"][3]["name"], json!("Hired"));

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/hr/vacancies")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "title": "Backend Engineer", "employment_type": "full_time" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let vacancy_id = common::read_json(response).await["id"].as_i64().unwrap();

    let public_api = Router::new()
        .route(
            "/api/public/applications",
            post(hiring_backend::routes::public::submit_application),
        )
        .route(
            "/api/public/applications/:code",
            get(hiring_backend::routes::public::track_application),
        )
        .with_state(state.clone());

    let boundary = "test-form-boundary";
    let vacancy_field = vacancy_id.to_string();
    let pdf = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF";
    let form = common::multipart_body(
        boundary,
        &[
            ("vacancy_id", vacancy_field.as_str()),
            ("full_name", "Maya Atayeva"),
            ("email", "maya@example.com"),
            ("phone", "+99312345678"),
            ("education", "higher"),
            ("experience_years", "5"),
            ("city", "Ashgabat"),
        ],
        Some(("resume", "resume.pdf", pdf)),
    );
    let response = public_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/public/applications")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = common::read_json(response).await;
    let tracking_code = body["tracking_code"].as_str().unwrap().to_string();
    assert_eq!(body["status"], json!("received"));

    // Same phone, same vacancy: a duplicate even under a different email.
    let duplicate = common::multipart_body(
        boundary,
        &[
            ("vacancy_id", vacancy_field.as_str()),
            ("full_name", "Maya Atayeva"),
            ("email", "maya.second@example.com"),
            ("phone", "+99312345678"),
            ("education", "higher"),
            ("experience_years", "5"),
            ("city", "Ashgabat"),
        ],
        Some(("resume", "resume.pdf", pdf)),
    );
    let response = public_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/public/applications")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(duplicate))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // A different phone under the same email is a new application.
    let second = common::multipart_body(
        boundary,
        &[
            ("vacancy_id", vacancy_field.as_str()),
            ("full_name", "Merdan Atayev"),
            ("email", "maya@example.com"),
            ("phone", "+99312345699"),
            ("education", "higher"),
            ("experience_years", "2"),
            ("city", "Ashgabat"),
        ],
        Some(("resume", "resume.pdf", pdf)),
    );
    let response = public_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/public/applications")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(second))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let candidate_id: i64 =
        sqlx::query_scalar("SELECT id FROM candidates WHERE tracking_code = ?")
            .bind(&tracking_code)
            .fetch_one(&state.pool)
            .await
            .unwrap();

    let resume_path = format!(
        "{}/resume_{}.pdf",
        hiring_backend::config::get_config().uploads_dir,
        tracking_code
    );
    assert!(tokio::fs::metadata(&resume_path).await.is_ok());

    let queued: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingest_jobs WHERE candidate_id = ?")
        .bind(candidate_id)
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(queued, 1);

    // Stand in for the scoring worker.
    sqlx::query("UPDATE candidates SET resume_text = 'Backend engineer, 5 years', ai_match_percent = 82 WHERE id = ?")
        .bind(candidate_id)
        .execute(&state.pool)
        .await
        .unwrap();

    // A standard stage outside the custom pipeline is not a legal target.
    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/hr/candidates/{}/stage", candidate_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "stage_id": 2 }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Rejecting without a reason leaves the candidate untouched.
    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/hr/candidates/{}/stage", candidate_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "stage_id": rejected_id }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::read_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Rejection reason"));

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/hr/candidates/{}", candidate_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = common::read_json(response).await;
    assert_eq!(body["current_stage_id"].as_i64().unwrap(), applied_id);
    assert_eq!(body["ai_match_percent"].as_i64().unwrap(), 82);
    assert_eq!(body["email"], json!("maya@example.com"));
    assert_eq!(body["phone"], json!("+99312345678"));

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/hr/candidates/{}/stage", candidate_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "stage_id": rejected_id, "rejection_reason_id": 3 }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["current_stage_id"].as_i64().unwrap(), rejected_id);
    assert_eq!(body["rejection_reason_id"].as_i64().unwrap(), 3);

    // Moving on to an accept stage clears the stored reason.
    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/hr/candidates/{}/stage", candidate_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "stage_id": hired_id }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["current_stage_id"].as_i64().unwrap(), hired_id);
    assert!(body["rejection_reason_id"].is_null());

    let response = public_api
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/public/applications/{}", tracking_code))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["vacancy_title"], json!("Backend Engineer"));
    assert_eq!(body["stage_name"], json!("Hired"));
    assert_eq!(body["status"], json!("ACCEPT"));
    let feed = body["notifications"].as_array().unwrap();
    assert_eq!(feed.len(), 3);
    assert_eq!(feed[0]["kind"], json!("offer"));
    assert_eq!(feed[2]["kind"], json!("application_received"));
}
