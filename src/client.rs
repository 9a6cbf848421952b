use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::csrf::CsrfCache;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUESTS, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS};
use crate::types::{
    AskParams, BotReply, ChatId, ChatSummary, CsrfResponse, HistoryBarParams, HistoryBarResponse,
    HistoryEntry, HistoryParams, HistoryResponse, SearchParams, SearchResponse,
};

/// Default location of the chat API.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/congressgpt/";
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const CSRF_HEADER: &str = "X-CSRFToken";

/// Client for the CongressGPT chat API.
///
/// Cookies are kept for the lifetime of the client, the way a browser keeps
/// them for a page with `credentials: 'include'`.  The CSRF token is fetched
/// once and echoed on every mutating call.
#[derive(Debug, Clone)]
pub struct CongressGpt {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    csrf: CsrfCache,
}

impl CongressGpt {
    /// Create a new client for the API rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = build_http_client(timeout, true)?;
        Ok(Self {
            client,
            base_url: normalize_base(base_url)?,
            timeout,
            csrf: CsrfCache::new(),
        })
    }

    /// Returns the API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the CSRF cache owned by this client.
    pub fn csrf_cache(&self) -> &CsrfCache {
        &self.csrf
    }

    /// Returns the CSRF token, fetching it from `GET csrf` on first use.
    pub async fn csrf_token(&self) -> Result<String> {
        self.csrf.get_or_fetch(|| self.fetch_csrf_token()).await
    }

    async fn fetch_csrf_token(&self) -> Result<String> {
        let url = self.base_url.join("csrf")?;
        let started = Instant::now();
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout));
        let result = match response {
            Ok(response) => decode::<CsrfResponse>(response).await,
            Err(err) => Err(err),
        };
        record_request(started, result.is_ok());
        let token = result?.csrf_token;
        tracing::debug!("fetched csrf token");
        Ok(token)
    }

    /// Lists the signed-in user's chats (`POST get_historybar`).
    pub async fn history_bar(&self, token: &str) -> Result<Vec<ChatSummary>> {
        let params = HistoryBarParams {
            token: token.to_string(),
        };
        let response: HistoryBarResponse = self.post("get_historybar", &params).await?;
        Ok(response.chats)
    }

    /// Sends a query (`POST ask`) and returns the bot's reply.
    pub async fn ask(&self, params: &AskParams) -> Result<BotReply> {
        self.post("ask", params).await
    }

    /// Runs the search the last bot message asked for (`POST search`).
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<BotReply>> {
        let response: SearchResponse = self.post("search", params).await?;
        Ok(response.response)
    }

    /// Fetches the stored messages of a chat (`POST get_history`).
    pub async fn history(&self, token: &str, chat_id: ChatId) -> Result<Vec<HistoryEntry>> {
        let params = HistoryParams {
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        };
        let response: HistoryResponse = self.post("get_history", &params).await?;
        Ok(response.history)
    }

    async fn post<P, R>(&self, endpoint: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.base_url.join(endpoint)?;
        let csrf = self.csrf_token().await?;
        let started = Instant::now();
        CLIENT_REQUESTS.click();

        let response = self
            .client
            .post(url)
            .headers(json_headers())
            .header(CSRF_HEADER, csrf)
            .json(params)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout));
        let result = match response {
            Ok(response) => {
                if response.status() == StatusCode::FORBIDDEN {
                    // Django answers a stale CSRF token with 403.
                    self.csrf.invalidate().await;
                }
                decode::<R>(response).await
            }
            Err(err) => Err(err),
        };
        record_request(started, result.is_ok());
        if let Err(err) = &result {
            tracing::warn!(endpoint, error = %err, "API request failed");
        }
        result
    }
}

pub(crate) fn build_http_client(timeout: Duration, cookies: bool) -> Result<ReqwestClient> {
    ReqwestClient::builder()
        .timeout(timeout)
        .cookie_store(cookies)
        .user_agent(concat!("congressgpt/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })
}

/// Parses a base URL, making sure relative joins land beneath it.
pub(crate) fn normalize_base(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

pub(crate) fn map_send_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::timeout(
            format!("Request timed out: {}", e),
            Some(timeout.as_secs_f64()),
        )
    } else if e.is_connect() {
        Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
    } else {
        Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
    }
}

pub(crate) fn record_request(started: Instant, ok: bool) {
    CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());
    if !ok {
        CLIENT_REQUEST_ERRORS.click();
    }
}

/// Decodes a successful JSON response or converts a failed one to an error.
pub(crate) async fn decode<R: DeserializeOwned>(response: Response) -> Result<R> {
    if !response.status().is_success() {
        return Err(process_error_response(response).await);
    }
    response.json::<R>().await.map_err(|e| {
        Error::serialization(
            format!("Failed to parse response: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Process API response errors and convert to our Error type.
///
/// The chat API reports `{"error": "..."}`; the auth provider uses `msg`,
/// `message`, or `error_description`.  Whichever is present becomes the
/// message, falling back to the raw body.
pub(crate) async fn process_error_response(response: Response) -> Error {
    let status = response.status();
    let status_code = status.as_u16();

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.parse::<u64>().ok());

    let error_body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            return Error::http_client(
                format!("Failed to read error response: {}", e),
                Some(Box::new(e)),
            );
        }
    };
    let error_message = error_message_from_body(&error_body)
        .unwrap_or_else(|| match status.canonical_reason() {
            Some(reason) if error_body.trim().is_empty() => reason.to_string(),
            _ => error_body.clone(),
        });

    match status_code {
        400 => Error::bad_request(error_message),
        401 => Error::authentication(error_message),
        403 => Error::permission(error_message),
        404 => Error::not_found(error_message, None, None),
        408 => Error::timeout(error_message, None),
        429 => Error::rate_limit(error_message, retry_after),
        500 => Error::internal_server(error_message),
        502..=504 => Error::service_unavailable(error_message, retry_after),
        _ => Error::api(status_code, error_message),
    }
}

fn error_message_from_body(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| match value.get(*key) {
            Some(Value::String(message)) => Some(message.clone()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
}
