pub mod auth;
pub mod gate;
pub mod logging;
pub mod request_id;

pub use auth::require_console_session;
pub use gate::request_gate;
pub use logging::log_error_responses;
pub use request_id::request_id;
