#![allow(dead_code)]

use std::env;

use hiring_backend::dto::admin_dto::CreateUserPayload;
use hiring_backend::AppState;
use uuid::Uuid;

/// Per-process test environment: throwaway SQLite file, migrations applied,
/// no mail gateway so notification delivery stays parked in the outbox.
pub async fn setup() -> AppState {
    dotenvy::dotenv().ok();
    let db_path = env::temp_dir().join(format!("hiring_test_{}.db", Uuid::new_v4()));
    let uploads_dir = env::temp_dir().join(format!("hiring_uploads_{}", Uuid::new_v4()));
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("DATABASE_URL", format!("sqlite:{}", db_path.display()));
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var(
        "ENCRYPTION_KEY",
        "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
    );
    env::set_var("OPENAI_API_KEY", "sk-test");
    env::set_var("UPLOADS_DIR", uploads_dir.display().to_string());
    env::set_var("PUBLIC_RPS", "100");
    env::set_var("LOGIN_RPS", "100");
    env::set_var("INGEST_WORKERS", "1");

    hiring_backend::config::init_config().expect("init config");

    let pool = hiring_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    AppState::new(pool)
}

pub async fn seed_user(state: &AppState, email: &str, role: &str) -> i64 {
    let user = state
        .user_service
        .create(CreateUserPayload {
            email: email.to_string(),
            password: "secret-password".to_string(),
            full_name: "Test Manager".to_string(),
            role: Some(role.to_string()),
        })
        .await
        .expect("seed user");
    user.id
}

pub fn token_for(user_id: i64, role: &str) -> String {
    hiring_backend::middleware::auth::issue_token(user_id, role).expect("token")
}

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Hand-rolled multipart encoder for the application form.
pub fn multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                boundary, name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}
