// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::Duration;

use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;

use edugen_core::domain::llm::{ChatMessage, ChatRequest, FinishReason, LLMError, LLMProvider};
use edugen_core::infrastructure::llm::{AnthropicAdapter, OllamaAdapter, OpenAICompatibleAdapter};

const TIMEOUT: Duration = Duration::from_secs(5);

fn request() -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::system("Be terse."), ChatMessage::user("Say hi")])
        .with_temperature(0.2)
        .with_max_tokens(16)
}

async fn collect(provider: &dyn LLMProvider) -> Result<String, LLMError> {
    let mut stream = provider.stream_chat_completion(&request()).await?;
    let mut out = String::new();
    while let Some(chunk) = stream.next().await {
        out.push_str(&chunk?);
    }
    Ok(out)
}

// ============================================================================
// OpenAI-compatible
// ============================================================================

#[tokio::test]
async fn test_openai_completion() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "stream": false,
            "max_tokens": 16,
            "messages": [
                {"role": "system", "content": "Be terse."},
                {"role": "user", "content": "Say hi"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "model": "gpt-4o-2024-08-06",
                "choices": [{"message": {"role": "assistant", "content": "Hi"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
            })
            .to_string(),
        )
        .create_async()
        .await;

    // Trailing /v1 is normalised away
    let base = format!("{}/v1/", server.url());
    let adapter = OpenAICompatibleAdapter::new("openai", &base, Some("sk-test".into()), "gpt-4o", TIMEOUT).unwrap();
    let response = adapter.send_chat_completion(&request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.content, "Hi");
    assert_eq!(response.model, "gpt-4o-2024-08-06");
    assert_eq!(response.usage.total_tokens, 13);
    assert_eq!(response.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn test_lmstudio_without_usage_estimates_tokens() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"choices": [{"message": {"content": "Hello there"}, "finish_reason": "length"}]}"#)
        .create_async()
        .await;

    let adapter = OpenAICompatibleAdapter::new("lmstudio", &server.url(), None, "local-model", TIMEOUT).unwrap();
    let response = adapter.send_chat_completion(&request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.model, "local-model");
    assert!(response.usage.prompt_tokens > 0);
    assert_eq!(response.usage.completion_tokens, 3);
    assert_eq!(response.finish_reason, FinishReason::Length);
}

#[tokio::test]
async fn test_openai_http_error_is_normalised() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let adapter = OpenAICompatibleAdapter::new("openai", &server.url(), Some("bad".into()), "gpt-4o", TIMEOUT).unwrap();
    let err = adapter.send_chat_completion(&request()).await.unwrap_err();

    match err {
        LLMError::ProviderRequestFailed { vendor, message } => {
            assert_eq!(vendor, "openai");
            assert!(message.contains("401"));
            assert!(message.contains("Incorrect API key"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_request_never_reaches_network() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .expect(0)
        .create_async()
        .await;

    let adapter = OpenAICompatibleAdapter::new("openai", &server.url(), None, "gpt-4o", TIMEOUT).unwrap();
    let err = adapter
        .send_chat_completion(&ChatRequest::new(vec![]))
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::InvalidRequest(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_openai_stream_stops_at_done() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        ": keep-alive\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
    );
    server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let adapter = OpenAICompatibleAdapter::new("openai", &server.url(), None, "gpt-4o", TIMEOUT).unwrap();
    assert_eq!(collect(&adapter).await.unwrap(), "Hello");
}

#[tokio::test]
async fn test_openai_list_models_and_connection() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/models")
        .with_status(200)
        .with_body(r#"{"data": [{"id": "gpt-4o"}, {"id": "gpt-4o-mini"}]}"#)
        .expect(2)
        .create_async()
        .await;

    let adapter = OpenAICompatibleAdapter::new("openai", &server.url(), Some("sk".into()), "gpt-4o", TIMEOUT).unwrap();
    assert_eq!(adapter.list_models().await.unwrap(), vec!["gpt-4o", "gpt-4o-mini"]);
    assert!(adapter.test_connection().await);
}

#[tokio::test]
async fn test_unreachable_server_fails_connection_test() {
    let adapter = OpenAICompatibleAdapter::new("lmstudio", "http://127.0.0.1:9", None, "m", Duration::from_secs(1)).unwrap();
    assert!(!adapter.test_connection().await);
}

// ============================================================================
// Anthropic
// ============================================================================

#[tokio::test]
async fn test_anthropic_completion_hoists_system() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "sk-ant")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(json!({
            "system": "Be terse.",
            "max_tokens": 16,
            "messages": [{"role": "user", "content": "Say hi"}]
        })))
        .with_status(200)
        .with_body(
            json!({
                "model": "claude-3-5-sonnet-20241022",
                "content": [{"type": "text", "text": "Hi"}, {"type": "text", "text": "!"}],
                "usage": {"input_tokens": 9, "output_tokens": 2},
                "stop_reason": "end_turn"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let adapter = AnthropicAdapter::new(&server.url(), "sk-ant".into(), "claude-3-5-sonnet-latest", 1024, TIMEOUT).unwrap();
    let response = adapter.send_chat_completion(&request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.content, "Hi!");
    assert_eq!(response.usage.prompt_tokens, 9);
    assert_eq!(response.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn test_anthropic_default_max_tokens() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_body(Matcher::PartialJson(json!({"max_tokens": 2048})))
        .with_status(200)
        .with_body(r#"{"content": [{"type": "text", "text": "ok"}], "usage": {"input_tokens": 1, "output_tokens": 1}, "stop_reason": "max_tokens"}"#)
        .create_async()
        .await;

    let adapter = AnthropicAdapter::new(&server.url(), "k".into(), "claude-3-5-haiku-latest", 2048, TIMEOUT).unwrap();
    let plain = ChatRequest::new(vec![ChatMessage::user("hello")]);
    let response = adapter.send_chat_completion(&plain).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.model, "claude-3-5-haiku-latest");
    assert_eq!(response.finish_reason, FinishReason::Length);
}

#[tokio::test]
async fn test_anthropic_stream() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi \"}}\n\n",
        "event: ping\n",
        "data: {\"type\":\"ping\"}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"there\"}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );
    server
        .mock("POST", "/v1/messages")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let adapter = AnthropicAdapter::new(&server.url(), "k".into(), "claude-3-5-sonnet-latest", 1024, TIMEOUT).unwrap();
    assert_eq!(collect(&adapter).await.unwrap(), "Hi there");
}

#[tokio::test]
async fn test_anthropic_stream_error_event() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body("data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n")
        .create_async()
        .await;

    let adapter = AnthropicAdapter::new(&server.url(), "k".into(), "claude-3-5-sonnet-latest", 1024, TIMEOUT).unwrap();
    let err = collect(&adapter).await.unwrap_err();
    assert!(err.to_string().contains("Overloaded"));
}

// ============================================================================
// Ollama
// ============================================================================

#[tokio::test]
async fn test_ollama_completion_uses_eval_counts() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({
            "model": "llama3.2",
            "stream": false,
            "options": {"num_predict": 16}
        })))
        .with_status(200)
        .with_body(
            r#"{"model": "llama3.2", "message": {"role": "assistant", "content": "Hi"}, "done": true,
                "done_reason": "stop", "prompt_eval_count": 20, "eval_count": 2}"#,
        )
        .create_async()
        .await;

    let adapter = OllamaAdapter::new(&server.url(), "llama3.2", TIMEOUT).unwrap();
    let response = adapter.send_chat_completion(&request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.content, "Hi");
    assert_eq!(response.usage.prompt_tokens, 20);
    assert_eq!(response.usage.completion_tokens, 2);
}

#[tokio::test]
async fn test_ollama_ndjson_stream() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
        "{\"message\":{\"role\":\"assistant\",\"content\":\"lo\"},\"done\":false}\n",
        "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"eval_count\":2}\n",
    );
    server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "application/x-ndjson")
        .with_body(body)
        .create_async()
        .await;

    let adapter = OllamaAdapter::new(&server.url(), "llama3.2", TIMEOUT).unwrap();
    assert_eq!(collect(&adapter).await.unwrap(), "Hello");
}

#[tokio::test]
async fn test_ollama_tags() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models": [{"name": "llama3.2:latest"}, {"name": "qwen2.5:7b"}]}"#)
        .create_async()
        .await;

    let adapter = OllamaAdapter::new(&server.url(), "llama3.2", TIMEOUT).unwrap();
    assert_eq!(adapter.list_models().await.unwrap(), vec!["llama3.2:latest", "qwen2.5:7b"]);
    assert!(adapter.test_connection().await);
}

#[tokio::test]
async fn test_ollama_error_field() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(r#"{"error": "model \"missing\" not found, try pulling it first"}"#)
        .create_async()
        .await;

    let adapter = OllamaAdapter::new(&server.url(), "missing", TIMEOUT).unwrap();
    let err = adapter.send_chat_completion(&request()).await.unwrap_err();
    assert!(err.to_string().contains("not found"));
}
