mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::{get, patch, post},
    Router,
};
use hiring_backend::dto::pipeline_dto::{CreateStagePayload, UpdateStagePayload};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn pipeline_customization_and_catalog() {
    let state = common::setup().await;
    let manager_id = common::seed_user(&state, "manager@example.com", "hr").await;
    let token = common::token_for(manager_id, "hr");

    // Fresh managers resolve to the standard catalog.
    let templates = state.pipeline_service.resolve(manager_id).await.unwrap();
    assert_eq!(templates.len(), 8);
    assert_eq!(templates[0].status, "NEW");
    assert!(templates.iter().all(|s| s.is_standard));
    assert!(!state.pipeline_service.is_customized(manager_id).await.unwrap());

    // Malformed pipelines are rejected before anything is written.
    assert!(state.pipeline_service.customize(manager_id, &[]).await.is_err());
    assert!(state
        .pipeline_service
        .customize(manager_id, &[1, 1, 7, 8])
        .await
        .is_err());
    assert!(
        state.pipeline_service.customize(manager_id, &[1, 2]).await.is_err(),
        "accept/reject stages are mandatory"
    );
    assert!(
        state.pipeline_service.customize(manager_id, &[7, 8]).await.is_err(),
        "an entry stage is mandatory"
    );
    assert!(
        state
            .pipeline_service
            .customize(manager_id, &[1, 7, 8, 999])
            .await
            .is_err(),
        "unknown stage ids are rejected"
    );
    assert!(!state.pipeline_service.is_customized(manager_id).await.unwrap());

    // A minimal valid pipeline: entry, accept, reject. Standard entries are
    // shared templates, so the members come back as private copies.
    let stages = state
        .pipeline_service
        .customize(manager_id, &[1, 7, 8])
        .await
        .unwrap();
    assert_eq!(stages.len(), 3);
    assert!(stages.iter().all(|s| !s.is_standard));
    assert!(stages.iter().all(|s| ![1, 7, 8].contains(&s.id)));
    let template_name = |id: i64| {
        templates
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
            .unwrap()
    };
    assert_eq!(stages[0].name, template_name(1));
    assert_eq!(stages[1].name, template_name(7));
    assert_eq!(stages[2].name, template_name(8));
    assert_eq!(stages[0].status, "NEW");
    assert_eq!(stages[2].status, "REJECT");
    assert!(state.pipeline_service.is_customized(manager_id).await.unwrap());
    assert_eq!(
        state.pipeline_service.first_stage(manager_id).await.unwrap().id,
        stages[0].id
    );
    assert!(state
        .pipeline_service
        .stage_in_pipeline(manager_id, stages[1].id)
        .await
        .unwrap());
    // The template itself is not a member.
    assert!(!state
        .pipeline_service
        .stage_in_pipeline(manager_id, 7)
        .await
        .unwrap());

    // The standard catalog is untouched by customization.
    let standard = state.pipeline_service.standard().await.unwrap();
    assert_eq!(standard.len(), 8);
    assert!(standard.iter().all(|s| s.is_standard));

    // Re-submitting the resolved pipeline reuses the copies rather than
    // copying again.
    let copy_ids: Vec<i64> = stages.iter().map(|s| s.id).collect();
    let again = state
        .pipeline_service
        .customize(manager_id, &copy_ids)
        .await
        .unwrap();
    assert_eq!(again.iter().map(|s| s.id).collect::<Vec<_>>(), copy_ids);

    // Customization never touches another manager's view.
    let other_id = common::seed_user(&state, "other@example.com", "hr").await;
    let other_stages = state.pipeline_service.resolve(other_id).await.unwrap();
    assert_eq!(other_stages.len(), 8);

    let hr_api = Router::new()
        .route(
            "/api/hr/pipeline",
            get(hiring_backend::routes::pipeline::get_pipeline)
                .delete(hiring_backend::routes::pipeline::reset_pipeline),
        )
        .route(
            "/api/hr/stages",
            get(hiring_backend::routes::pipeline::list_stages),
        )
        .layer(axum::middleware::from_fn(
            hiring_backend::middleware::auth::require_hr_or_admin,
        ))
        .with_state(state.clone());

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/hr/pipeline")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["customized"], json!(true));
    assert_eq!(body["stages"].as_array().unwrap().len(), 3);

    // No token, no pipeline.
    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/hr/pipeline")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/hr/pipeline")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["customized"], json!(false));
    assert_eq!(body["stages"].as_array().unwrap().len(), 8);

    let response = hr_api
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/hr/stages")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    // Eight standard entries plus the three copies made during customization.
    assert_eq!(body.as_array().unwrap().len(), 11);

    // Color and status codes are checked up front when editing the catalog.
    assert!(state
        .pipeline_service
        .create_stage(CreateStagePayload {
            name: "Reference check".to_string(),
            description: None,
            color: Some("#zzz".to_string()),
            sort_order: None,
            status: None,
        })
        .await
        .is_err());
    assert!(state
        .pipeline_service
        .create_stage(CreateStagePayload {
            name: "Reference check".to_string(),
            description: None,
            color: None,
            sort_order: None,
            status: Some("WAITING".to_string()),
        })
        .await
        .is_err());

    let stage = state
        .pipeline_service
        .create_stage(CreateStagePayload {
            name: "Reference check".to_string(),
            description: Some("Calling previous employers".to_string()),
            color: Some("#123abc".to_string()),
            sort_order: None,
            status: Some("IN_PROGRESS".to_string()),
        })
        .await
        .unwrap();
    assert!(!stage.is_standard);
    assert_eq!(stage.color, "#123abc");

    // Standard entries cannot be deactivated or deleted.
    assert!(state
        .pipeline_service
        .update_stage(
            1,
            UpdateStagePayload {
                name: None,
                description: None,
                color: None,
                sort_order: None,
                status: None,
                is_active: Some(false),
            },
        )
        .await
        .is_err());
    assert!(state.pipeline_service.delete_stage(1).await.is_err());

    // Custom entries can be renamed and removed while unreferenced.
    let renamed = state
        .pipeline_service
        .update_stage(
            stage.id,
            UpdateStagePayload {
                name: Some("Background check".to_string()),
                description: None,
                color: None,
                sort_order: None,
                status: None,
                is_active: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Background check");
    state.pipeline_service.delete_stage(stage.id).await.unwrap();

    // Rejection reason catalog over the admin routes.
    let admin_id = common::seed_user(&state, "admin@example.com", "admin").await;
    let admin_token = common::token_for(admin_id, "admin");
    let admin_api = Router::new()
        .route(
            "/api/admin/rejection-reasons",
            post(hiring_backend::routes::pipeline::create_rejection_reason),
        )
        .route(
            "/api/admin/rejection-reasons/:id",
            patch(hiring_backend::routes::pipeline::update_rejection_reason)
                .delete(hiring_backend::routes::pipeline::delete_rejection_reason),
        )
        .layer(axum::middleware::from_fn(
            hiring_backend::middleware::auth::require_admin,
        ))
        .with_state(state.clone());

    let response = admin_api
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/rejection-reasons")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "name": "Salary expectations too high" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let reason_id = common::read_json(response).await["id"].as_i64().unwrap();

    let response = admin_api
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/admin/rejection-reasons/{}", reason_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "is_active": false }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["is_active"], json!(false));

    // An hr token cannot touch the admin catalog.
    let response = admin_api
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/rejection-reasons/{}", reason_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = admin_api
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/rejection-reasons/{}", reason_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
