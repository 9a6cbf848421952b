use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::auth::{AuthProvider, AuthSession, SessionToken};
use crate::client::{
    DEFAULT_TIMEOUT, build_http_client, decode, json_headers, map_send_error, normalize_base,
    process_error_response, record_request,
};
use crate::error::{Error, Result};
use crate::observability::CLIENT_REQUESTS;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

/// [`AuthProvider`] backed by a Supabase project's GoTrue endpoints.
///
/// The refresh token issued at sign-in is kept in memory and rotated on
/// every refresh.
#[derive(Debug)]
pub struct SupabaseAuth {
    client: ReqwestClient,
    base_url: Url,
    api_key: String,
    timeout: Duration,
    refresh_token: Mutex<Option<String>>,
}

impl SupabaseAuth {
    /// Creates a provider for the project at `project_url` using its public
    /// (anon) API key.
    pub fn new(project_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Self::with_options(project_url, api_key, None)
    }

    /// Creates a provider with a custom request timeout.
    pub fn with_options(
        project_url: &str,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        Ok(Self {
            client: build_http_client(timeout, false)?,
            base_url: normalize_base(project_url)?,
            api_key: api_key.into(),
            timeout,
            refresh_token: Mutex::new(None),
        })
    }

    /// Seeds the refresh token, e.g. from a session established elsewhere.
    pub fn with_refresh_token(self, refresh_token: impl Into<String>) -> Self {
        self.store_refresh_token(Some(refresh_token.into()));
        self
    }

    /// Returns true if a refresh token is held.
    pub fn has_refresh_token(&self) -> bool {
        self.current_refresh_token().is_some()
    }

    fn current_refresh_token(&self) -> Option<String> {
        self.refresh_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store_refresh_token(&self, refresh_token: Option<String>) {
        *self
            .refresh_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = refresh_token;
    }

    async fn post(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: serde_json::Value,
    ) -> Result<reqwest::Response> {
        let url = self.base_url.join(path)?;
        let started = Instant::now();
        CLIENT_REQUESTS.click();
        let result = self
            .client
            .post(url)
            .headers(json_headers())
            .header("apikey", &self.api_key)
            .bearer_auth(bearer.unwrap_or(self.api_key.as_str()))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout));
        record_request(
            started,
            result
                .as_ref()
                .is_ok_and(|response| response.status().is_success()),
        );
        result
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<AuthSession> {
        let path = format!("auth/v1/token?grant_type={grant_type}");
        let response = self.post(&path, None, body).await?;
        let token: TokenResponse = decode(response).await?;
        self.session_from(token)?
            .ok_or_else(|| Error::authentication("auth provider returned no access token"))
    }

    fn session_from(&self, token: TokenResponse) -> Result<Option<AuthSession>> {
        let Some(access_token) = token.access_token else {
            return Ok(None);
        };
        if let Some(refresh_token) = token.refresh_token {
            self.store_refresh_token(Some(refresh_token));
        }
        let access_token = SessionToken::new(access_token);
        let email = token
            .user
            .and_then(|user| user.email)
            .or_else(|| access_token.email().map(str::to_string));
        Ok(Some(AuthSession {
            access_token,
            email,
        }))
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::validation(
                "Please fill in the fields",
                Some("email".to_string()),
            ));
        }
        let session = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;
        tracing::info!(email, "signed in");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthSession>> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::validation(
                "Please fill in the fields",
                Some("email".to_string()),
            ));
        }
        let response = self
            .post(
                "auth/v1/signup",
                None,
                json!({ "email": email, "password": password }),
            )
            .await?;
        let token: TokenResponse = decode(response).await?;
        let session = self.session_from(token)?;
        if session.is_none() {
            tracing::info!(email, "registered; awaiting email confirmation");
        }
        Ok(session)
    }

    async fn refresh_session(&self) -> Result<AuthSession> {
        let Some(refresh_token) = self.current_refresh_token() else {
            return Err(Error::authentication(
                "no refresh token held; sign in first",
            ));
        };
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .post("auth/v1/logout", Some(access_token), json!({}))
            .await?;
        self.store_refresh_token(None);
        if !response.status().is_success() {
            return Err(process_error_response(response).await);
        }
        Ok(())
    }
}
