#![allow(dead_code)]

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use congressgpt::{
    ChatController, CongressGpt, SessionManager, SessionToken, SupabaseAuth, SupabaseRatings,
};

pub const API_PATH: &str = "/api/congressgpt";
pub const EMAIL: &str = "me@example.com";

pub fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// An unsigned JWT carrying `exp` and `email` claims.
pub fn jwt(exp: i64, email: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp, "email": email }).to_string());
    format!("{header}.{payload}.signature")
}

pub fn api_base(server: &MockServer) -> String {
    format!("{}{API_PATH}/", server.uri())
}

pub fn api_path(endpoint: &str) -> String {
    format!("{API_PATH}/{endpoint}")
}

pub async fn mount_csrf(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(api_path("csrf")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "csrfToken": "csrf-1" })))
        .mount(server)
        .await;
}

pub fn bot_reply(order: i64, chat_id: i64, search_request: bool) -> Value {
    json!({
        "content": format!("reply {order}"),
        "orderInChat": order,
        "chatId": chat_id,
        "searchRequest": search_request,
        "searchResponse": false,
        "role": "assistant",
    })
}

/// A controller signed in with a fresh token, talking to `server` for both
/// the chat API and Supabase.
pub fn controller(server: &MockServer) -> ChatController {
    let session = session_with(server, SessionToken::new(jwt(now() + 3600, EMAIL)), None);
    controller_with(server, session)
}

pub fn session_with(
    server: &MockServer,
    token: SessionToken,
    refresh_token: Option<&str>,
) -> SessionManager {
    let mut auth = SupabaseAuth::new(&server.uri(), "anon-key").unwrap();
    if let Some(refresh_token) = refresh_token {
        auth = auth.with_refresh_token(refresh_token);
    }
    SessionManager::new(Arc::new(auth)).with_token(token)
}

pub fn controller_with(server: &MockServer, session: SessionManager) -> ChatController {
    let client = CongressGpt::new(&api_base(server)).unwrap();
    let ratings = SupabaseRatings::new(&server.uri(), "anon-key").unwrap();
    ChatController::new(client, session, Arc::new(ratings))
}
