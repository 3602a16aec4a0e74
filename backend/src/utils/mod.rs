pub mod cookies;
pub mod password;
pub mod security;

pub use password::*;
pub use security::*;
