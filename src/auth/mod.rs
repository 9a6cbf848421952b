//! Session Manager: bearer-token freshness and the auth provider seam.
//!
//! - [`token`]: the session token and its decoded expiry
//! - [`provider`]: the [`AuthProvider`] trait
//! - [`supabase`]: the GoTrue-backed provider
//! - [`manager`]: [`SessionManager`], which hands out valid tokens

mod manager;
mod provider;
mod supabase;
pub(crate) mod token;

pub use manager::SessionManager;
pub use provider::{AuthProvider, AuthSession};
pub use supabase::SupabaseAuth;
pub use token::SessionToken;
