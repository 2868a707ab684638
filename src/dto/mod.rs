pub mod admin_dto;
pub mod candidate_dto;
pub mod pipeline_dto;
pub mod public_dto;
pub mod vacancy_dto;
