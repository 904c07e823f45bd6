//! Integration tests for the OpenAI streaming adapter against a mock HTTP server.

use std::time::Duration;

use futures::StreamExt;
use mockito::Matcher;
use pretty_assertions::assert_eq;
use refundlens_abstraction::{ChatMessage, ModelError, ModelParameters, StreamingModel};
use refundlens_models::OpenAIChatModel;
use serde_json::json;

fn sse_body(deltas: &[&str]) -> String {
    let mut body = String::new();
    body.push_str("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for delta in deltas {
        let chunk = json!({ "choices": [{ "delta": { "content": delta } }] });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn model_for(server: &mockito::ServerGuard) -> OpenAIChatModel {
    OpenAIChatModel::new(
        "gpt-4o-mini",
        format!("{}/v1", server.url()),
        "test-key",
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_streams_deltas_in_order() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "max_tokens": 200
        })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&["Your refund ", "is on ", "its way."]))
        .create_async()
        .await;

    let model = model_for(&server);
    let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("Where is it?")];
    let stream = model
        .stream_chat_completion(&messages, Some(ModelParameters::with_max_tokens(200)))
        .await
        .unwrap();

    let deltas: Vec<String> = stream.map(Result::unwrap).collect().await;
    assert_eq!(deltas, vec!["Your refund ", "is on ", "its way."]);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_fails_to_open() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let model = model_for(&server);
    let result = model.stream_chat_completion(&[ChatMessage::user("hi")], None).await;

    match result {
        Err(ModelError::AuthenticationError(msg)) => {
            assert!(msg.contains("Authentication failed"));
        }
        Err(other) => panic!("Expected AuthenticationError, got {other:?}"),
        Ok(_) => panic!("Expected the stream to fail to open"),
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_fails_to_open() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body(r#"{"error": {"message": "Rate limit reached"}}"#)
        .create_async()
        .await;

    let model = model_for(&server);
    let result = model.stream_chat_completion(&[ChatMessage::user("hi")], None).await;
    assert!(matches!(result, Err(ModelError::QuotaExceeded { .. })));
}

#[tokio::test]
async fn test_unreachable_server_fails_to_open() {
    // Port 9 (discard) is not expected to accept HTTP connections
    let model = OpenAIChatModel::new(
        "gpt-4o-mini",
        "http://127.0.0.1:9/v1",
        "test-key",
        Duration::from_secs(2),
    )
    .unwrap();

    let result = model.stream_chat_completion(&[ChatMessage::user("hi")], None).await;
    assert!(matches!(result, Err(ModelError::RequestError(_))));
}

#[tokio::test]
async fn test_error_event_mid_stream() {
    let mut server = mockito::Server::new_async().await;
    let body = format!(
        "data: {}\n\ndata: {}\n\n",
        json!({ "choices": [{ "delta": { "content": "Partial" } }] }),
        json!({ "error": { "message": "upstream overloaded" } })
    );
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let model = model_for(&server);
    let stream = model.stream_chat_completion(&[ChatMessage::user("hi")], None).await.unwrap();
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Ok("Partial".to_string()));
    assert!(matches!(&items[1], Err(ModelError::ModelResponseError(msg)) if msg.contains("overloaded")));
}
