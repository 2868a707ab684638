pub mod audit_log;
pub mod candidate;
pub mod ingest_job;
pub mod notification;
pub mod rejection_reason;
pub mod stage;
pub mod user;
pub mod vacancy;

pub use audit_log::AuditLog;
pub use candidate::Candidate;
pub use ingest_job::IngestJob;
pub use notification::Notification;
pub use rejection_reason::RejectionReason;
pub use stage::{PipelineStage, SelectionStage, StageStatus};
pub use user::User;
pub use vacancy::{Question, QuestionKind, Vacancy};
