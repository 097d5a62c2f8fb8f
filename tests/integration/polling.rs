//! The polling loop against a mocked Bot API and SWIS endpoint

use pretty_assertions::assert_eq;
use serde_json::json;
use topnodes::{
    bot::Bot,
    conversation::{ConversationState, Controller, MENU_AGAIN_PROMPT, MENU_PROMPT},
};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
}

fn text_update(update_id: i64, chat: i64, text: &str) -> serde_json::Value {
    json!({
        "update_id": update_id,
        "message": { "message_id": update_id, "chat": { "id": chat }, "text": text }
    })
}

#[tokio::test]
async fn test_start_then_cpu_round_trip() {
    let swis = MockServer::start().await;
    let telegram = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(create_nodes_json(&[
            ("A", Some(90.0), Some(20.0)),
            ("B", Some(50.0), Some(40.0)),
        ])))
        .expect(1)
        .mount(&swis)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .and(query_param("offset", "0"))
        .respond_with(ok(json!([
            text_update(1, 7, "/start"),
            text_update(2, 7, "CPU"),
        ])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&telegram)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .and(query_param("offset", "3"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&telegram)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(json!({ "chat_id": 7, "text": MENU_PROMPT })))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&telegram)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(json!({ "chat_id": 7, "text": MENU_AGAIN_PROMPT })))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&telegram)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendPhoto")))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&telegram)
        .await;

    let client = create_telegram_client(&telegram);
    let mut bot = Bot::new(Controller::new(
        create_swis_client(&swis),
        FileRenderer::new(),
        client.clone(),
    ));

    assert_eq!(bot.poll_once(&client).await.unwrap(), 2);
    assert_eq!(bot.sessions().state(7), ConversationState::AwaitingChoice);

    let charts = bot.controller().renderer().charts();
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].bars.len(), 2);

    assert_eq!(bot.poll_once(&client).await.unwrap(), 0);
}

#[tokio::test]
async fn test_backend_outage_ends_conversation() {
    let swis = MockServer::start().await;
    let telegram = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&swis)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .respond_with(ok(json!([
            text_update(10, 9, "/start"),
            text_update(11, 9, "memoria"),
        ])))
        .up_to_n_times(1)
        .mount(&telegram)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .respond_with(ok(json!({})))
        .expect(2)
        .mount(&telegram)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendPhoto")))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&telegram)
        .await;

    let client = create_telegram_client(&telegram);
    let mut bot = Bot::new(Controller::new(
        create_swis_client(&swis),
        FileRenderer::new(),
        client.clone(),
    ));

    assert_eq!(bot.poll_once(&client).await.unwrap(), 2);
    assert_eq!(bot.sessions().state(9), ConversationState::Start);
    assert_eq!(bot.sessions().active(), 0);
    assert!(bot.controller().renderer().charts().is_empty());
}

#[tokio::test]
async fn test_failed_poll_is_an_error() {
    let telegram = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        })))
        .mount(&telegram)
        .await;

    let swis = MockServer::start().await;
    let client = create_telegram_client(&telegram);
    let mut bot = Bot::new(Controller::new(
        create_swis_client(&swis),
        FileRenderer::new(),
        client.clone(),
    ));

    assert!(bot.poll_once(&client).await.is_err());
}
