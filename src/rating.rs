//! Persistence of per-message ratings.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde_json::json;
use url::Url;

use crate::client::{
    DEFAULT_TIMEOUT, build_http_client, json_headers, map_send_error, normalize_base,
    process_error_response, record_request,
};
use crate::error::Result;
use crate::observability::CLIENT_REQUESTS;
use crate::types::{ChatId, Rating};

/// Stores a message's rating, keyed by its chat and position.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Persists `rating` for message `order_in_chat` of `chat_id`.
    async fn update_rating(
        &self,
        token: &str,
        chat_id: ChatId,
        order_in_chat: i64,
        rating: Rating,
    ) -> Result<()>;
}

/// [`RatingStore`] writing to the `messages` table through Supabase's REST
/// interface.
#[derive(Debug, Clone)]
pub struct SupabaseRatings {
    client: ReqwestClient,
    base_url: Url,
    api_key: String,
    timeout: Duration,
}

impl SupabaseRatings {
    /// Creates a store for the project at `project_url`.
    pub fn new(project_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Self::with_options(project_url, api_key, None)
    }

    /// Creates a store with a custom request timeout.
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
        })
    }

    fn messages_url(&self, chat_id: ChatId, order_in_chat: i64) -> Result<Url> {
        let mut url = self.base_url.join("rest/v1/messages")?;
        url.query_pairs_mut()
            .append_pair("order_in_chat", &format!("eq.{order_in_chat}"))
            .append_pair("chats_id", &format!("eq.{chat_id}"));
        Ok(url)
    }
}

#[async_trait]
impl RatingStore for SupabaseRatings {
    async fn update_rating(
        &self,
        token: &str,
        chat_id: ChatId,
        order_in_chat: i64,
        rating: Rating,
    ) -> Result<()> {
        let url = self.messages_url(chat_id, order_in_chat)?;
        let started = Instant::now();
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .patch(url)
            .headers(json_headers())
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .json(&json!({ "rating": rating }))
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout));
        let result = match response {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(process_error_response(response).await),
            Err(err) => Err(err),
        };
        record_request(started, result.is_ok());
        result
    }
}
