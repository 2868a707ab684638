use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use hiring_backend::{
    config::{get_config, init_config},
    database::{bootstrap::seed_admin_user, pool::create_pool},
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);
    seed_admin_user(&app_state.pool, &app_state.cipher).await?;

    for worker in 0..config.ingest_workers {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state.ingest_service.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(750)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Ingest worker {} error", worker);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state.notification_service.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Notification worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let public_api = Router::new()
        .route(
            "/api/public/vacancies",
            get(routes::public::list_vacancies),
        )
        .route(
            "/api/public/vacancies/:id",
            get(routes::public::get_vacancy),
        )
        .route(
            "/api/public/applications",
            post(routes::public::submit_application),
        )
        .route(
            "/api/public/applications/:code",
            get(routes::public::track_application),
        )
        .layer(axum::middleware::from_fn_with_state(
            hiring_backend::middleware::rate_limit::new_rps_state(config.public_rps),
            hiring_backend::middleware::rate_limit::rps_middleware,
        ));

    let auth_api = Router::new()
        .route("/api/auth/login", post(routes::admin::login))
        .layer(axum::middleware::from_fn_with_state(
            hiring_backend::middleware::rate_limit::new_rps_state(config.login_rps),
            hiring_backend::middleware::rate_limit::rps_middleware,
        ));

    let hr_api = Router::new()
        .route(
            "/api/hr/vacancies",
            get(routes::vacancy::list_vacancies).post(routes::vacancy::create_vacancy),
        )
        .route(
            "/api/hr/vacancies/generate-description",
            post(routes::vacancy::generate_description),
        )
        .route(
            "/api/hr/vacancies/:id",
            get(routes::vacancy::get_vacancy)
                .patch(routes::vacancy::update_vacancy)
                .delete(routes::vacancy::delete_vacancy),
        )
        .route(
            "/api/hr/vacancies/:id/archive",
            post(routes::vacancy::archive_vacancy),
        )
        .route(
            "/api/hr/candidates",
            get(routes::candidate_routes::list_candidates),
        )
        .route(
            "/api/hr/candidates/:id",
            get(routes::candidate_routes::get_candidate),
        )
        .route(
            "/api/hr/candidates/:id/stage",
            post(routes::candidate_routes::move_candidate_stage),
        )
        .route(
            "/api/hr/candidates/:id/comment",
            patch(routes::candidate_routes::update_hr_comment),
        )
        .route(
            "/api/hr/candidates/:id/reprocess",
            post(routes::candidate_routes::reprocess_resume),
        )
        .route(
            "/api/hr/candidates/:id/ingest",
            get(routes::candidate_routes::get_ingest_status),
        )
        .route(
            "/api/hr/candidates/:id/notifications",
            get(routes::candidate_routes::list_candidate_notifications),
        )
        .route(
            "/api/hr/candidates/:id/audit",
            get(routes::candidate_routes::list_candidate_audit),
        )
        .route(
            "/api/hr/pipeline",
            get(routes::pipeline::get_pipeline)
                .put(routes::pipeline::customize_pipeline)
                .delete(routes::pipeline::reset_pipeline),
        )
        .route("/api/hr/stages", get(routes::pipeline::list_stages))
        .route(
            "/api/hr/rejection-reasons",
            get(routes::pipeline::list_rejection_reasons),
        )
        .layer(axum::middleware::from_fn(
            hiring_backend::middleware::auth::require_hr_or_admin,
        ));

    let admin_api = Router::new()
        .route("/api/admin/stages", post(routes::pipeline::create_stage))
        .route(
            "/api/admin/stages/:id",
            patch(routes::pipeline::update_stage).delete(routes::pipeline::delete_stage),
        )
        .route(
            "/api/admin/rejection-reasons",
            post(routes::pipeline::create_rejection_reason),
        )
        .route(
            "/api/admin/rejection-reasons/:id",
            patch(routes::pipeline::update_rejection_reason)
                .delete(routes::pipeline::delete_rejection_reason),
        )
        .route(
            "/api/admin/users",
            get(routes::admin::list_users).post(routes::admin::create_user),
        )
        .route("/api/admin/users/:id", patch(routes::admin::update_user))
        .layer(axum::middleware::from_fn(
            hiring_backend::middleware::auth::require_admin,
        ));

    info!("Serving uploads from: {}", config.uploads_dir);

    let app = base_routes
        .merge(public_api)
        .merge(auth_api)
        .merge(hr_api)
        .merge(admin_api)
        .nest_service(
            "/uploads",
            tower_http::services::ServeDir::new(config.uploads_dir.clone()),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(12 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
