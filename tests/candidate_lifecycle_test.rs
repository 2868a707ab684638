mod common;

use std::env;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::{get, post},
    Router,
};
use hiring_backend::database::bootstrap::seed_admin_user;
use hiring_backend::dto::admin_dto::UpdateUserPayload;
use serde_json::json;
use tower::ServiceExt;

const BOUNDARY: &str = "test-form-boundary";
const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF";

fn submit_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/public/applications")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn accounts_form_validation_and_visibility() {
    env::set_var("ADMIN_EMAIL", "root@example.com");
    env::set_var("ADMIN_PASSWORD", "admin-secret-1");
    let state = common::setup().await;
    seed_admin_user(&state.pool, &state.cipher).await.unwrap();

    let auth_api = Router::new()
        .route("/api/auth/login", post(hiring_backend::routes::admin::login))
        .with_state(state.clone());

    // Wrong password and unknown email answer identically.
    let response = auth_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "root@example.com", "password": "wrong-password" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::read_json(response).await;
    assert_eq!(body["error"], json!("Invalid credentials"));

    let response = auth_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "nobody@example.com", "password": "wrong-password" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::read_json(response).await;
    assert_eq!(body["error"], json!("Invalid credentials"));

    let response = auth_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "Root@Example.com", "password": "admin-secret-1" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    let admin_token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["role"], json!("admin"));
    assert_eq!(body["user"]["email"], json!("root@example.com"));

    let owner_id = common::seed_user(&state, "owner@example.com", "hr").await;
    let owner_token = common::token_for(owner_id, "hr");
    let rival_id = common::seed_user(&state, "colleague@example.com", "hr").await;
    let rival_token = common::token_for(rival_id, "hr");

    let hr_api = Router::new()
        .route(
            "/api/hr/vacancies",
            post(hiring_backend::routes::vacancy::create_vacancy),
        )
        .route(
            "/api/hr/candidates",
            get(hiring_backend::routes::candidate_routes::list_candidates),
        )
        .route(
            "/api/hr/candidates/:id",
            get(hiring_backend::routes::candidate_routes::get_candidate),
        )
        .layer(axum::middleware::from_fn(
            hiring_backend::middleware::auth::require_hr_or_admin,
        ))
        .with_state(state.clone());

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/hr/vacancies")
                .header(header::AUTHORIZATION, format!("Bearer {}", owner_token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "title": "Data Engineer",
                        "employment_type": "full_time",
                        "questions": [{
                            "id": "q1",
                            "text": "Preferred database",
                            "kind": "choice",
                            "required": true,
                            "options": ["PostgreSQL", "SQLite"]
                        }]
                    })
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

    let vacancy_id_field = vacancy_id.to_string();
    let base_fields: Vec<(&str, &str)> = vec![
        ("vacancy_id", vacancy_id_field.as_str()),
        ("full_name", "Test Candidate Person"),
        ("email", "cand@example.com"),
        ("phone", "+99365001122"),
        ("education", "higher"),
        ("experience_years", "3"),
        ("city", "Mary"),
    ];
    let resume = Some(("resume", "cv.pdf", PDF_BYTES));

    // Required question left unanswered.
    let body = common::multipart_body(BOUNDARY, &base_fields, resume);
    let response = public_api.clone().oneshot(submit_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::read_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Missing answer for required question"));

    // Answer for a question the vacancy never asked.
    let mut fields = base_fields.clone();
    let answers = json!({ "q1": "PostgreSQL", "q9": "extra" }).to_string();
    fields.push(("vacancy_answers", answers.as_str()));
    let body = common::multipart_body(BOUNDARY, &fields, resume);
    let response = public_api.clone().oneshot(submit_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::read_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Unknown question id"));

    // Choice answers must come from the declared options.
    let mut fields = base_fields.clone();
    let answers = json!({ "q1": "MySQL" }).to_string();
    fields.push(("vacancy_answers", answers.as_str()));
    let body = common::multipart_body(BOUNDARY, &fields, resume);
    let response = public_api.clone().oneshot(submit_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Education outside the fixed list.
    let answers = json!({ "q1": "PostgreSQL" }).to_string();
    let mut fields = base_fields.clone();
    fields.push(("vacancy_answers", answers.as_str()));
    let mut bad_education = fields.clone();
    bad_education[4] = ("education", "bootcamp");
    let body = common::multipart_body(BOUNDARY, &bad_education, resume);
    let response = public_api.clone().oneshot(submit_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Long enough for the form check but too few digits once normalized.
    let mut bad_phone = fields.clone();
    bad_phone[3] = ("phone", "(12) 345-678");
    let body = common::multipart_body(BOUNDARY, &bad_phone, resume);
    let response = public_api.clone().oneshot(submit_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::read_json(response).await;
    assert_eq!(body["error"], json!("Phone number is too short"));

    // Nothing was written by any of the rejected submissions.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates")
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let body = common::multipart_body(BOUNDARY, &fields, resume);
    let response = public_api.clone().oneshot(submit_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = common::read_json(response).await;
    let tracking_code = body["tracking_code"].as_str().unwrap().to_string();

    // The owning manager sees the candidate, a colleague does not.
    let list = |token: String| {
        let hr_api = hr_api.clone();
        async move {
            let response = hr_api
                .oneshot(
                    Request::builder()
                        .method("GET")
                        .uri("/api/hr/candidates")
                        .header(header::AUTHORIZATION, format!("Bearer {}", token))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            common::read_json(response).await
        }
    };
    let owner_list = list(owner_token.clone()).await;
    assert_eq!(owner_list["total"], json!(1));
    let candidate_id = owner_list["items"][0]["id"].as_i64().unwrap();
    assert_eq!(owner_list["items"][0]["vacancy_title"], json!("Data Engineer"));

    let rival_list = list(rival_token.clone()).await;
    assert_eq!(rival_list["total"], json!(0));

    let admin_list = list(admin_token.clone()).await;
    assert_eq!(admin_list["total"], json!(1));

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/hr/candidates/{}", candidate_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", rival_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/hr/candidates/{}", candidate_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", owner_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = common::read_json(response).await;
    assert_eq!(detail["email"], json!("cand@example.com"));
    assert_eq!(detail["phone"], json!("+99365001122"));
    assert_eq!(detail["vacancy_answers"]["q1"], json!("PostgreSQL"));
    assert_eq!(detail["tracking_code"], json!(tracking_code));

    // Unknown tracking codes stay a flat 404.
    let response = public_api
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/public/applications/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deactivated accounts keep their password but lose access.
    state
        .user_service
        .update(
            rival_id,
            UpdateUserPayload {
                full_name: None,
                password: None,
                role: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();
    let response = auth_api
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "colleague@example.com", "password": "secret-password" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = common::read_json(response).await;
    assert_eq!(body["error"], json!("Account is disabled"));
}
