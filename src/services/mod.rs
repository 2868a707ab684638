pub mod ai_service;
pub mod audit_service;
pub mod candidate_service;
pub mod ingest_service;
pub mod notification_service;
pub mod pipeline_service;
pub mod user_service;
pub mod vacancy_service;
