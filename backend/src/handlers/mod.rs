pub mod analytics;
pub mod cache;
pub mod console_auth;
pub mod health;
pub mod leads;
pub mod quotes;
