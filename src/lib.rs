pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    ai_service::AIService, audit_service::AuditService, candidate_service::CandidateService,
    ingest_service::IngestService, notification_service::NotificationService,
    pipeline_service::PipelineService, user_service::UserService, vacancy_service::VacancyService,
};
use crate::utils::crypto::FieldCipher;
use reqwest::Client;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub cipher: FieldCipher,
    pub vacancy_service: VacancyService,
    pub candidate_service: CandidateService,
    pub pipeline_service: PipelineService,
    pub notification_service: NotificationService,
    pub ai_service: AIService,
    pub ingest_service: IngestService,
    pub audit_service: AuditService,
    pub user_service: UserService,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();
        let cipher = FieldCipher::from_hex_key(&config.encryption_key)
            .expect("ENCRYPTION_KEY must be 64 hex characters");

        let pipeline_service = PipelineService::new(pool.clone());
        let vacancy_service = VacancyService::new(pool.clone());
        let candidate_service = CandidateService::new(pool.clone(), cipher.clone());
        let notification_service = NotificationService::new(
            pool.clone(),
            cipher.clone(),
            config.mail_gateway_url.clone(),
        );
        let ai_service = AIService::new(
            pool.clone(),
            config.openai_api_key.clone(),
            http_client,
        );
        let audit_service = AuditService::new(pool.clone());
        let ingest_service = IngestService::new(
            pool.clone(),
            candidate_service.clone(),
            ai_service.clone(),
            notification_service.clone(),
            audit_service.clone(),
        );
        let user_service = UserService::new(pool.clone(), cipher.clone());

        Self {
            pool,
            cipher,
            vacancy_service,
            candidate_service,
            pipeline_service,
            notification_service,
            ai_service,
            ingest_service,
            audit_service,
            user_service,
        }
    }
}
