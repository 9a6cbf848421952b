//! Session and chat list behavior against mock Supabase and chat backends.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use congressgpt::{AuthProvider, ChatId, HistorySelector, SessionToken, SupabaseAuth};

use common::{
    EMAIL, api_base, api_path, bot_reply, controller_with, jwt, mount_csrf, now, session_with,
};

#[tokio::test]
async fn expired_token_is_refreshed_once() {
    let server = MockServer::start().await;
    let fresh = jwt(now() + 3600, EMAIL);
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(header("apikey", "anon-key"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": &fresh,
            "refresh_token": "refresh-2",
            "expires_in": 3600,
            "user": { "email": EMAIL },
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_csrf(&server).await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .and(wiremock::matchers::body_partial_json(
            json!({ "password": &fresh }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(bot_reply(1, 4, false)))
        .expect(1)
        .mount(&server)
        .await;

    let expired = SessionToken::new(jwt(now() - 60, EMAIL));
    let session = session_with(&server, expired, Some("refresh-1"));
    let (a, b) = tokio::join!(session.valid_token(), session.valid_token());
    assert_eq!(a.unwrap().as_str(), fresh);
    assert_eq!(b.unwrap().as_str(), fresh);

    let controller = controller_with(&server, session);
    controller.submit_query("what passed today").await.unwrap();
}

#[tokio::test]
async fn failed_refresh_leaves_the_user_message_unsent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let expired = SessionToken::new(jwt(now() - 60, EMAIL));
    let controller = controller_with(&server, session_with(&server, expired, Some("stale")));
    let err = controller.submit_query("hello there").await.unwrap_err();
    assert!(err.is_authentication(), "{err:?}");
    assert!(err.to_string().contains("Invalid Refresh Token"));
    assert_eq!(controller.messages().len(), 1);
}

#[tokio::test]
async fn sign_in_with_password() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_json(json!({ "email": EMAIL, "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": jwt(now() + 3600, EMAIL),
            "refresh_token": "refresh-1",
            "user": { "email": EMAIL },
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials",
        })))
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(&server.uri(), "anon-key").unwrap();
    let session = auth.sign_in_with_password(EMAIL, "hunter2").await.unwrap();
    assert_eq!(session.email.as_deref(), Some(EMAIL));
    assert!(!session.access_token.is_expired());
    assert!(auth.has_refresh_token());

    let err = auth
        .sign_in_with_password(EMAIL, "wrong")
        .await
        .unwrap_err();
    assert!(err.is_bad_request());
    assert!(err.to_string().contains("Invalid login credentials"));

    let err = auth.sign_in_with_password("", "x").await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn sign_up_awaiting_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "5f1c",
            "email": "new@example.com",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = SupabaseAuth::new(&server.uri(), "anon-key").unwrap();
    let session = auth.sign_up("new@example.com", "pw123456").await.unwrap();
    assert!(session.is_none());
}

#[tokio::test]
async fn chat_list_reloads_when_a_new_chat_appears() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    Mock::given(method("POST"))
        .and(path(api_path("get_historybar")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chats": [
                { "chatId": 12, "title": "Filibuster rules" },
                { "chatId": "9", "title": null },
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let session = session_with(&server, SessionToken::new(jwt(now() + 3600, EMAIL)), None);
    let client = congressgpt::CongressGpt::new(&api_base(&server)).unwrap();
    let mut history = HistorySelector::new(client);

    assert!(history.refresh(&session, None).await.unwrap());
    assert!(!history.refresh(&session, None).await.unwrap());
    assert!(
        history
            .refresh(&session, ChatId::new(12).ok())
            .await
            .unwrap()
    );
    assert_eq!(history.chats().len(), 2);
    assert_eq!(history.chats()[1].chat_id, ChatId::new(9).unwrap());
    assert_eq!(history.chats()[1].title, "");
}
