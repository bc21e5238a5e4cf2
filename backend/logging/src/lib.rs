//! Structured logging for dripforge.
//!
//! Handles subscriber setup (console plus rolling NDJSON file) and redaction
//! of personal data and credentials in logged error details.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;
