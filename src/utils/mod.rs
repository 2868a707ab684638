pub mod crypto;
pub mod resume_text;
pub mod time;
