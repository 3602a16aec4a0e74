//! Persistence seams. Each store is a trait so services can run against
//! Postgres in production and mocks or in-memory stores in tests.

pub mod credential;
pub mod quote;
pub mod session;

pub use credential::{CredentialStore, PgCredentialStore};
pub use quote::{PgQuoteRepository, QuoteRepository};
pub use session::{PgSessionStore, SessionStore};
