pub mod admin;
pub mod candidate_routes;
pub mod health;
pub mod pipeline;
pub mod public;
pub mod vacancy;
