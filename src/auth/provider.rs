use async_trait::async_trait;

use crate::auth::SessionToken;
use crate::error::Result;

/// A signed-in session as issued by the auth provider.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The bearer token sent with API calls.
    pub access_token: SessionToken,
    /// The signed-in user's email, when the provider reports it.
    pub email: Option<String>,
}

/// Authentication-as-a-service collaborator.
///
/// Implementations own whatever long-lived credential they need to mint new
/// access tokens (for example a refresh token); the session manager only ever
/// sees access tokens.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Signs in with email and password.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Registers a new account.
    ///
    /// Returns `None` when the provider requires email confirmation before
    /// issuing a session.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthSession>>;

    /// Issues a fresh access token for the current session.
    async fn refresh_session(&self) -> Result<AuthSession>;

    /// Ends the session identified by `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}
