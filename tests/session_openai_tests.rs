//! Tests for the OpenAI-compatible session against a mock server.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{skill, StubExecutor};
use skill_runner::config::ConnectionDescriptor;
use skill_runner::error::SkillError;
use skill_runner::runner::SkillRunner;
use skill_runner::session::{ConnectRequest, ModelSession, OpenAiConnector, SessionConnector};
use skill_runner::types::{ExecuteOptions, SessionEvent, SessionMessage};
use skill_runner::util::retry::RetryPolicy;

fn sse(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let chunk = json!({"choices": [{"index": 0, "delta": {"content": delta}}]});
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn connector(server: &MockServer) -> OpenAiConnector {
    OpenAiConnector::new(ConnectionDescriptor {
        base_url: server.uri(),
        api_key: "sk-test".to_string(),
        model: "gpt-test".to_string(),
    })
    .with_retry_policy(RetryPolicy::none())
}

fn message(content: &str) -> SessionMessage {
    SessionMessage {
        session_id: "s-1".to_string(),
        content: content.to_string(),
    }
}

async fn open(connector: &OpenAiConnector, model: Option<&str>) -> Box<dyn ModelSession> {
    connector
        .connect(ConnectRequest {
            session_id: "s-1".to_string(),
            model: model.map(str::to_string),
        })
        .await
        .unwrap()
}

async fn drain(session: &mut dyn ModelSession) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Some(event) = session.next_event().await {
        let event = event.unwrap();
        let done = event == SessionEvent::TurnComplete;
        events.push(event);
        if done {
            break;
        }
    }
    events
}

#[tokio::test]
async fn streams_deltas_and_completes_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-test", "stream": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&["Hel", "lo!"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut session = open(&connector(&server), None).await;
    session.send(message("hi")).await.unwrap();

    assert_eq!(
        drain(session.as_mut()).await,
        vec![
            SessionEvent::text_delta("Hel"),
            SessionEvent::text_delta("lo!"),
            SessionEvent::assistant_message("Hello!"),
            SessionEvent::TurnComplete,
        ]
    );
}

#[tokio::test]
async fn transcript_is_replayed_on_later_sends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&["ok"]), "text/event-stream"))
        .mount(&server)
        .await;

    let mut session = open(&connector(&server), Some("qwen-plus")).await;
    session.send(message("first")).await.unwrap();
    drain(session.as_mut()).await;
    session.send(message("second")).await.unwrap();
    drain(session.as_mut()).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = requests[1].body_json().unwrap();
    assert_eq!(body["model"], "qwen-plus");
    assert_eq!(
        body["messages"],
        json!([
            {"role": "user", "content": "first"},
            {"role": "assistant", "content": "ok"},
            {"role": "user", "content": "second"},
        ])
    );
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let mut session = open(&connector(&server), None).await;
    let err = session.send(message("hi")).await.unwrap_err();

    assert!(matches!(err, SkillError::Authentication(ref m) if m == "invalid key"));
}

#[tokio::test]
async fn server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = open(&connector(&server), None).await;
    let err = session.send(message("hi")).await.unwrap_err();

    assert!(matches!(err, SkillError::Api { status: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn runner_over_http_hides_directive_and_runs_action() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&["Checking. ", "[EXECUTE_SCRIPT]\nuser_input: list\n[/EXECUTE_SCRIPT]"]),
            "text/event-stream",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse(&["Two skills."]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let executor = Arc::new(StubExecutor::default());
    let runner = SkillRunner::new(skill(), Arc::new(connector(&server)), executor.clone());

    let result = runner.execute("list", ExecuteOptions::new()).await.unwrap();

    assert_eq!(result.content, "Two skills.");
    assert_eq!(executor.calls(), vec!["list".to_string()]);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = requests[1].body_json().unwrap();
    let last = &body["messages"][2]["content"];
    assert!(last.as_str().unwrap().starts_with("[SCRIPT_RESULT]"));
    runner.end().await;
}
