// Public modules
pub mod auth;
pub mod chat;
pub mod client;
pub mod controller;
pub mod csrf;
pub mod error;
pub mod history;
pub mod observability;
pub mod rating;
pub mod transcript;
pub mod types;
pub mod utils;

// Re-exports
pub use auth::{AuthProvider, AuthSession, SessionManager, SessionToken, SupabaseAuth};
pub use client::{CongressGpt, DEFAULT_API_BASE};
pub use controller::{ChatController, MAX_QUERY_WORDS, Phase, validate_query};
pub use csrf::CsrfCache;
pub use error::{Error, Result};
pub use history::{ChatSelection, HistorySelector};
pub use observability::register_biometrics;
pub use rating::{RatingStore, SupabaseRatings};
pub use transcript::Transcript;
pub use types::*;
