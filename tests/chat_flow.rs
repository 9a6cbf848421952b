//! End-to-end transcript flows against a mock CongressGPT backend.

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use congressgpt::{Author, ChatId, MessageContent, Phase, Rating, RatingSync, Vote};

use common::{EMAIL, api_path, bot_reply, controller, mount_csrf};

fn orders(messages: &[congressgpt::Message]) -> Vec<i64> {
    messages.iter().map(|m| m.order_in_chat).collect()
}

async fn mount_history(server: &MockServer, chat_id: i64, orders: &[i64]) {
    let history: Vec<_> = orders
        .iter()
        .map(|order| {
            json!({
                "role": if order % 2 == 0 { "user" } else { "assistant" },
                "content": format!("stored {order}"),
                "rating": 0,
                "orderInChat": order,
                "chatId": chat_id,
                "searchRequest": false,
                "searchResponse": false,
            })
        })
        .collect();
    Mock::given(method("POST"))
        .and(path(api_path("get_history")))
        .and(body_partial_json(json!({ "chat_id": chat_id.to_string() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "history": history })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn first_query_starts_a_chat() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .and(header("X-CSRFToken", "csrf-1"))
        .and(body_partial_json(json!({
            "user_input": "who chairs the judiciary committee",
            "email": EMAIL,
            "order_in_chat": 0,
            "chat_id": null,
            "language_model": "gpt-4-1106-preview",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(bot_reply(1, 42, false)))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let added = controller
        .submit_query("who chairs the judiciary committee")
        .await
        .unwrap();
    assert_eq!(added.len(), 1);

    let messages = controller.messages();
    assert_eq!(orders(&messages), vec![0, 1]);
    assert_eq!(messages[0].author, Author::User);
    assert_eq!(messages[1].author, Author::Bot);
    assert_eq!(messages[1].label(), "GPT");
    assert_eq!(controller.chat_id(), ChatId::new(42).ok());
    assert_eq!(controller.highest_chat_id(), ChatId::new(42).ok());
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn word_limit_is_checked_before_sending() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    let controller = controller(&server);

    let err = controller
        .submit_query(&"word ".repeat(501))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(controller.messages().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());

    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .respond_with(ResponseTemplate::new(200).set_body_json(bot_reply(1, 5, false)))
        .expect(1)
        .mount(&server)
        .await;
    controller
        .submit_query(&"word ".repeat(500))
        .await
        .unwrap();
    assert_eq!(controller.messages().len(), 2);
}

#[tokio::test]
async fn search_request_appends_results_in_order() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .respond_with(ResponseTemplate::new(200).set_body_json(bot_reply(1, 7, true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("search")))
        .and(body_partial_json(json!({ "chat_id": 7 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": [
                {
                    "content": "A summary of the results.",
                    "orderInChat": 3,
                    "chatId": 7,
                    "searchRequest": false,
                    "searchResponse": false,
                },
                {
                    "content": "[{'title': 'H.R. 2', 'sponsor': 'Rep. Smith'}]",
                    "orderInChat": 2,
                    "chatId": 7,
                    "searchRequest": false,
                    "searchResponse": true,
                },
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let added = controller
        .submit_query("bills about farm subsidies")
        .await
        .unwrap();
    assert_eq!(orders(&added), vec![1, 2, 3]);

    let messages = controller.messages();
    assert_eq!(orders(&messages), vec![0, 1, 2, 3]);
    assert_eq!(messages[1].label(), "Search Query");
    assert_eq!(messages[2].label(), "Search Results");
    assert!(matches!(
        messages[2].content,
        MessageContent::SearchResults(ref results) if results.len() == 1
    ));
}

#[tokio::test]
async fn failed_query_keeps_only_the_user_message() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "model unavailable" })),
        )
        .mount(&server)
        .await;

    let controller = controller(&server);
    let err = controller.submit_query("what is a quorum").await.unwrap_err();
    assert!(err.is_server_error());
    assert!(err.to_string().contains("model unavailable"));

    let messages = controller.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].author, Author::User);
    assert_eq!(controller.chat_id(), None);
    assert_eq!(controller.phase(), Phase::Idle);

    // Input is enabled again: the next query is sent, not rejected as busy.
    let err = controller.submit_query("try again").await.unwrap_err();
    assert!(!err.is_busy());
    assert_eq!(orders(&controller.messages()), vec![0, 1]);
}

#[tokio::test]
async fn overlapping_queries_are_rejected() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(bot_reply(1, 3, false))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_query("first question").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(controller.phase(), Phase::Pending);
    assert!(controller.submit_query("second question").await.unwrap_err().is_busy());

    first.await.unwrap().unwrap();
    assert_eq!(orders(&controller.messages()), vec![0, 1]);
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn history_is_sorted_ascending() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    mount_history(&server, 42, &[3, 0, 2, 1]).await;

    let controller = controller(&server);
    let messages = controller
        .load_history(ChatId::new(42).unwrap())
        .await
        .unwrap();
    assert_eq!(orders(&messages), vec![0, 1, 2, 3]);
    assert_eq!(messages[1].author, Author::Bot);
    assert_eq!(controller.chat_id(), ChatId::new(42).ok());
}

#[tokio::test]
async fn history_click_discards_a_pending_reply() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    mount_history(&server, 42, &[1, 0]).await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(bot_reply(1, 99, false))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let controller = controller(&server);
    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_query("a question left hanging").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    controller
        .load_history(ChatId::new(42).unwrap())
        .await
        .unwrap();
    assert_eq!(controller.phase(), Phase::Idle);

    let err = pending.await.unwrap().unwrap_err();
    assert!(err.is_abort(), "{err:?}");

    let messages = controller.messages();
    assert_eq!(orders(&messages), vec![0, 1]);
    assert!(
        messages
            .iter()
            .all(|m| m.chat_id == ChatId::new(42).ok())
    );
    assert_eq!(controller.chat_id(), ChatId::new(42).ok());
}

#[tokio::test]
async fn queries_are_rejected_while_a_chat_loads() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    let history: Vec<_> = [0, 1]
        .iter()
        .map(|order| {
            json!({
                "role": if order % 2 == 0 { "user" } else { "assistant" },
                "content": format!("stored {order}"),
                "rating": 0,
                "orderInChat": order,
                "chatId": 42,
            })
        })
        .collect();
    Mock::given(method("POST"))
        .and(path(api_path("get_history")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "history": history }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .respond_with(ResponseTemplate::new(200).set_body_json(bot_reply(5, 99, false)))
        .expect(0)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let loading = tokio::spawn({
        let controller = controller.clone();
        async move { controller.load_history(ChatId::new(42).unwrap()).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(controller.phase(), Phase::LoadingHistory);
    let err = controller.submit_query("new question").await.unwrap_err();
    assert!(err.is_busy(), "{err:?}");

    assert_eq!(orders(&loading.await.unwrap().unwrap()), vec![0, 1]);
    let messages = controller.messages();
    assert_eq!(orders(&messages), vec![0, 1]);
    assert!(
        messages
            .iter()
            .all(|m| m.chat_id == ChatId::new(42).ok())
    );
    assert_eq!(controller.chat_id(), ChatId::new(42).ok());
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn reply_for_another_chat_is_not_appended() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    mount_history(&server, 42, &[0, 1]).await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .respond_with(ResponseTemplate::new(200).set_body_json(bot_reply(3, 99, false)))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller(&server);
    controller
        .load_history(ChatId::new(42).unwrap())
        .await
        .unwrap();
    let err = controller.submit_query("a follow-up").await.unwrap_err();
    assert!(err.is_protocol(), "{err:?}");
    assert_eq!(orders(&controller.messages()), vec![0, 1, 2]);
    assert_eq!(controller.chat_id(), ChatId::new(42).ok());
    assert_eq!(controller.highest_chat_id(), ChatId::new(42).ok());
}

#[tokio::test]
async fn search_results_for_another_chat_are_not_appended() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .respond_with(ResponseTemplate::new(200).set_body_json(bot_reply(1, 7, true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("search")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": [
                {
                    "content": "A summary of the results.",
                    "orderInChat": 2,
                    "chatId": 8,
                    "searchRequest": false,
                    "searchResponse": false,
                },
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller(&server);
    let err = controller
        .submit_query("bills about farm subsidies")
        .await
        .unwrap_err();
    assert!(err.is_protocol(), "{err:?}");
    assert_eq!(orders(&controller.messages()), vec![0, 1]);
    assert_eq!(controller.chat_id(), ChatId::new(7).ok());
}

#[tokio::test]
async fn failed_history_load_keeps_the_transcript() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    mount_history(&server, 42, &[0, 1]).await;
    Mock::given(method("POST"))
        .and(path(api_path("get_history")))
        .and(body_partial_json(json!({ "chat_id": "43" })))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "no such chat" })))
        .mount(&server)
        .await;

    let controller = controller(&server);
    controller
        .load_history(ChatId::new(42).unwrap())
        .await
        .unwrap();
    let err = controller
        .load_history(ChatId::new(43).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(controller.chat_id(), ChatId::new(42).ok());
    assert_eq!(controller.messages().len(), 2);
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn rating_double_click_returns_to_neutral() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    mount_history(&server, 42, &[0, 1]).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/messages"))
        .and(query_param("order_in_chat", "eq.1"))
        .and(query_param("chats_id", "eq.42"))
        .and(header("apikey", "anon-key"))
        .and(body_json(json!({ "rating": 1 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/messages"))
        .and(body_json(json!({ "rating": 0 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller(&server);
    controller
        .load_history(ChatId::new(42).unwrap())
        .await
        .unwrap();
    assert_eq!(controller.set_rating(1, Vote::Up).await.unwrap(), Rating::Up);
    assert_eq!(
        controller.set_rating(1, Vote::Up).await.unwrap(),
        Rating::Neutral
    );
    let bot = &controller.messages()[1];
    assert_eq!(bot.rating, Rating::Neutral);
    assert_eq!(bot.rating_sync, RatingSync::Synced);
}

#[tokio::test]
async fn failed_rating_is_marked_unsynced() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    mount_history(&server, 42, &[0, 1]).await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let controller = controller(&server);
    controller
        .load_history(ChatId::new(42).unwrap())
        .await
        .unwrap();
    assert!(controller.set_rating(1, Vote::Down).await.is_err());
    let bot = &controller.messages()[1];
    assert_eq!(bot.rating, Rating::Down);
    assert!(bot.rating_sync.is_unsynced());
}

#[tokio::test]
async fn csrf_token_is_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("csrf")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "csrfToken": "only" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .and(header("X-CSRFToken", "only"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bot_reply(1, 8, false)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("ask")))
        .and(header("X-CSRFToken", "only"))
        .and(body_partial_json(json!({ "chat_id": 8, "order_in_chat": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(bot_reply(3, 8, false)))
        .mount(&server)
        .await;

    let controller = controller(&server);
    controller.submit_query("first").await.unwrap();
    controller.submit_query("second").await.unwrap();
    assert_eq!(orders(&controller.messages()), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn new_chat_clears_the_transcript() {
    let server = MockServer::start().await;
    mount_csrf(&server).await;
    mount_history(&server, 42, &[0, 1]).await;

    let controller = controller(&server);
    controller
        .load_history(ChatId::new(42).unwrap())
        .await
        .unwrap();
    controller.start_new_chat().await.unwrap();
    assert!(controller.messages().is_empty());
    assert_eq!(controller.chat_id(), None);
    assert_eq!(controller.highest_chat_id(), ChatId::new(42).ok());
}
