//! Input validation and sanitization for public request payloads.
//!
//! Free text is sanitized before it is validated so length limits apply to
//! what will actually be stored.

pub mod rules;
pub mod sanitize;

pub use validator::Validate;
