use std::sync::{Arc, Mutex, MutexGuard};

use crate::auth::{AuthProvider, AuthSession, SessionToken};
use crate::error::{Error, Result};
use crate::observability::{AUTH_REFRESHES, AUTH_REFRESH_ERRORS};

#[derive(Debug, Default)]
struct SessionState {
    token: Option<SessionToken>,
    email: Option<String>,
}

/// Holds the current session token and refreshes it on demand.
///
/// Cloning yields another handle to the same session.  Refreshes are
/// single-flighted: concurrent callers that all observe an expired token wait
/// on one provider call and share its result.
#[derive(Clone)]
pub struct SessionManager {
    provider: Arc<dyn AuthProvider>,
    state: Arc<Mutex<SessionState>>,
    refresh_gate: Arc<tokio::sync::Mutex<()>>,
}

impl SessionManager {
    /// Creates a signed-out session manager.
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            state: Arc::new(Mutex::new(SessionState::default())),
            refresh_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Seeds the manager with an existing token.
    pub fn with_token(self, token: SessionToken) -> Self {
        self.set_token(token);
        self
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the held token.
    pub fn set_token(&self, token: SessionToken) {
        let mut state = self.state();
        if state.email.is_none() {
            state.email = token.email().map(str::to_string);
        }
        state.token = Some(token);
    }

    /// Returns the held token without checking its expiry.
    pub fn current_token(&self) -> Option<SessionToken> {
        self.state().token.clone()
    }

    /// Returns the signed-in user's email.
    pub fn user_email(&self) -> Option<String> {
        self.state().email.clone()
    }

    /// Returns true if a token is held, expired or not.
    pub fn is_signed_in(&self) -> bool {
        self.state().token.is_some()
    }

    fn fresh_token(&self) -> Option<SessionToken> {
        self.state()
            .token
            .as_ref()
            .filter(|token| !token.is_expired())
            .cloned()
    }

    fn adopt(&self, session: AuthSession) -> SessionToken {
        let mut state = self.state();
        if let Some(email) = session.email {
            state.email = Some(email);
        } else if state.email.is_none() {
            state.email = session.access_token.email().map(str::to_string);
        }
        state.token = Some(session.access_token.clone());
        session.access_token
    }

    /// Returns an unexpired token, refreshing through the provider if needed.
    ///
    /// A failed refresh is reported as an authentication error and is not
    /// retried.
    pub async fn valid_token(&self) -> Result<SessionToken> {
        if let Some(token) = self.fresh_token() {
            return Ok(token);
        }
        let _gate = self.refresh_gate.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(token) = self.fresh_token() {
            return Ok(token);
        }
        AUTH_REFRESHES.click();
        match self.provider.refresh_session().await {
            Ok(session) => {
                tracing::debug!(expires_at = ?session.access_token.expires_at(), "session refreshed");
                Ok(self.adopt(session))
            }
            Err(err) => {
                AUTH_REFRESH_ERRORS.click();
                tracing::error!(error = %err, "failed to refresh session");
                if err.is_authentication() {
                    Err(err)
                } else {
                    Err(Error::authentication(format!(
                        "failed to refresh session: {err}"
                    )))
                }
            }
        }
    }

    /// Signs in with email and password, replacing any held session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        let mut state = self.state();
        state.email = session
            .email
            .or_else(|| Some(email.to_string()));
        state.token = Some(session.access_token);
        Ok(())
    }

    /// Registers a new account.
    ///
    /// Returns true if the provider issued a session immediately, false if the
    /// account awaits email confirmation.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<bool> {
        match self.provider.sign_up(email, password).await? {
            Some(session) => {
                let mut state = self.state();
                state.email = session.email.or_else(|| Some(email.to_string()));
                state.token = Some(session.access_token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Ends the session.  Local state is cleared even if the provider call
    /// fails.
    pub async fn sign_out(&self) -> Result<()> {
        let token = {
            let mut state = self.state();
            state.email = None;
            state.token.take()
        };
        match token {
            Some(token) => self.provider.sign_out(token.as_str()).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("SessionManager")
            .field("token", &state.token)
            .field("email", &state.email)
            .finish()
    }
}
