//! HTTP client tests against a mock Khoj server.

mod common;

use std::time::Duration;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use khoj_chat::chat::{FileAccessMode, OpenFile};
use khoj_chat::client::KhojClient;
use khoj_chat::config::KhojConfig;
use khoj_chat::error::KhojError;
use khoj_chat::session::{TurnDriver, TurnOutcome};
use khoj_chat::types::ChatEvent;
use khoj_chat::util::RetryPolicy;

use common::{body, Identity, RecordingView};

fn test_retry_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(1),
        multiplier: 2.0,
    }
}

fn client_for(server: &MockServer) -> KhojClient {
    KhojClient::new(KhojConfig::default().with_url(server.uri()).with_api_key("kk-test"))
        .unwrap()
        .with_retry(test_retry_policy(3))
}

#[tokio::test]
async fn create_session_returns_conversation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions"))
        .and(header("authorization", "Bearer kk-test"))
        .and(query_param("agent_slug", "sage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"conversation_id": "c-17"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = client_for(&server).create_session(Some("sage")).await.unwrap();
    assert_eq!(id, "c-17");
}

#[tokio::test]
async fn create_session_is_not_retried_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).create_session(None).await.unwrap_err();
    assert!(matches!(err, KhojError::Api { status: 503, .. }));
}

#[tokio::test]
async fn malformed_session_body_is_a_serialization_error_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "c-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).create_session(None).await.unwrap_err();
    assert!(matches!(err, KhojError::Serialization(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn list_sessions_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server).list_sessions().await.unwrap_err();
    assert!(matches!(err, KhojError::Api { status: 503, .. }));
}

#[tokio::test]
async fn single_attempt_policy_lists_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_retry(RetryPolicy::none());
    assert!(client.list_sessions().await.is_err());
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token"})))
        .expect(1)
        .mount(&server)
        .await;

    match client_for(&server).create_session(None).await {
        Err(KhojError::Authentication(message)) => assert_eq!(message, "Invalid token"),
        other => panic!("expected authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn list_sessions_parses_titles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .and(query_param("client", "khoj-chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"conversation_id": "c-1", "slug": "Trip planning"},
            {"conversation_id": "c-2", "slug": null}
        ])))
        .mount(&server)
        .await;

    let sessions = client_for(&server).list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].title(), "Trip planning");
    assert_eq!(sessions[1].title(), "New conversation");
}

#[tokio::test]
async fn stream_chat_posts_request_and_decodes_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(query_param("client", "khoj-chat"))
        .and(body_partial_json(json!({
            "q": "/notes summary",
            "n": 5,
            "stream": true,
            "conversation_id": "c-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(body(&[
            r#"{"type":"status","data":"Reading"}"#,
            "Summary",
            r#"{"type":"end_response","data":""}"#,
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let request = client.request_for("/notes summary", "c-1");
    let events: Vec<ChatEvent> = client
        .stream_chat(&request)
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            ChatEvent::Status("Reading".into()),
            ChatEvent::text("Summary"),
            ChatEvent::EndResponse,
        ]
    );
}

#[tokio::test]
async fn failed_chat_request_is_one_inline_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut driver = TurnDriver::new(client.config().url.clone(), Identity);
    let input = driver.prepare(&client, "hello", "c-1", &[], false);
    let mut view = RecordingView::default();

    let outcome = driver
        .send(&client, input, &mut view, &CancellationToken::new())
        .await;

    assert!(matches!(
        outcome,
        TurnOutcome::Interrupted {
            error: Some(KhojError::Api { status: 500, .. })
        }
    ));
    assert_eq!(view.errors.len(), 1);
}

#[tokio::test]
async fn prepared_query_carries_mode_and_open_files() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let driver = TurnDriver::new(client.config().url.clone(), Identity)
        .with_file_access(FileAccessMode::Read);
    let files = [OpenFile::new("Plan", "- ship it")];

    let input = driver.prepare(&client, "/notes   what's next?", "c-1", &files, true);

    assert_eq!(input.raw_query, "/notes   what's next?");
    assert!(input.is_voice);
    assert!(input.request.q.starts_with("/notes what's next?\n\n[SYSTEM]"));
    assert!(input.request.q.contains("# Plan\n```markdown\n- ship it\n```"));
}
