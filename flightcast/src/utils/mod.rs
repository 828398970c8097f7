pub mod hash;
pub mod log_redaction;
