// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Anthropic LLM Provider Adapter
//
// Anti-Corruption Layer for the Anthropic Messages API

use std::time::{Duration, Instant};

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::{build_client, ensure_success, network_error, normalize_base_url, sse_data, LineBuffer, StreamEvent};
use crate::domain::llm::{
    ChatMessage, ChatRequest, ChatResponse, ChatRole, ChatStream, FinishReason, LLMError,
    LLMProvider, TokenUsage,
};

const VENDOR: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

/// Anthropic has no model discovery endpoint
const KNOWN_MODELS: &[&str] = &[
    "claude-3-5-sonnet-latest",
    "claude-3-5-haiku-latest",
    "claude-3-opus-latest",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

pub struct AnthropicAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    default_max_tokens: u32,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<AnthropicContent>,
    usage: AnthropicUsage,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<AnthropicDelta>,
    #[serde(default)]
    error: Option<AnthropicStreamError>,
}

#[derive(Deserialize)]
struct AnthropicDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicStreamError {
    #[serde(default)]
    message: String,
}

impl AnthropicAdapter {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: impl Into<String>,
        default_max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LLMError> {
        Ok(Self {
            client: build_client(VENDOR, timeout)?,
            base_url: normalize_base_url(base_url),
            api_key,
            model: model.into(),
            default_max_tokens,
        })
    }

    fn request_body<'a>(&'a self, request: &'a ChatRequest, stream: bool) -> AnthropicRequest<'a> {
        let (system, messages) = split_system(&request.messages);
        AnthropicRequest {
            model: request.model_or(&self.model),
            messages,
            system,
            max_tokens: request.max_tokens.unwrap_or(self.default_max_tokens),
            temperature: request.temperature,
            stream,
        }
    }

    async fn post_messages(&self, body: &AnthropicRequest<'_>) -> Result<reqwest::Response, LLMError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(VENDOR, e))?;
        ensure_success(VENDOR, response).await
    }
}

/// System messages go in the top-level `system` field, joined by blank lines
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<AnthropicMessage<'_>>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect();

    let conversation = messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| AnthropicMessage {
            role: m.role.as_str(),
            content: &m.content,
        })
        .collect();

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, conversation)
}

fn parse_stream_line(line: &str) -> Result<Option<StreamEvent>, LLMError> {
    let Some(data) = sse_data(line) else {
        return Ok(None);
    };
    if data.is_empty() {
        return Ok(None);
    }

    let event: AnthropicStreamEvent = serde_json::from_str(data)
        .map_err(|e| LLMError::request_failed(VENDOR, format!("Malformed stream event: {}", e)))?;
    match event.kind.as_str() {
        "content_block_delta" => Ok(event
            .delta
            .and_then(|d| d.text)
            .filter(|text| !text.is_empty())
            .map(StreamEvent::Delta)),
        "message_stop" => Ok(Some(StreamEvent::Done)),
        "error" => Err(LLMError::request_failed(
            VENDOR,
            event.error.map(|e| e.message).unwrap_or_else(|| "stream error".into()),
        )),
        _ => Ok(None),
    }
}

fn delta_stream(response: reqwest::Response) -> impl Stream<Item = Result<String, LLMError>> + Send {
    let mut bytes = response.bytes_stream();

    try_stream! {
        let mut lines = LineBuffer::default();
        let mut done = false;

        while !done {
            let Some(chunk) = bytes.next().await else {
                break;
            };
            let chunk = chunk.map_err(|e| network_error(VENDOR, e))?;
            lines.push(&chunk);

            while let Some(line) = lines.next_line() {
                match parse_stream_line(&line)? {
                    Some(StreamEvent::Delta(text)) => yield text,
                    Some(StreamEvent::Done) => {
                        done = true;
                        break;
                    }
                    None => {}
                }
            }
        }
    }
}

#[async_trait]
impl LLMProvider for AnthropicAdapter {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn send_chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, LLMError> {
        request.validate()?;

        let started = Instant::now();
        let body = self.request_body(request, false);
        let response = self.post_messages(&body).await?;

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LLMError::request_failed(VENDOR, format!("Failed to parse response: {}", e)))?;

        let content: String = anthropic_response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        Ok(ChatResponse {
            content,
            model: anthropic_response.model.unwrap_or_else(|| body.model.to_string()),
            usage: TokenUsage::new(
                anthropic_response.usage.input_tokens,
                anthropic_response.usage.output_tokens,
            ),
            finish_reason: FinishReason::from_vendor(anthropic_response.stop_reason.as_deref()),
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn stream_chat_completion(&self, request: &ChatRequest) -> Result<ChatStream, LLMError> {
        request.validate()?;

        let body = self.request_body(request, true);
        let response = self.post_messages(&body).await?;
        Ok(Box::pin(delta_stream(response)))
    }

    async fn test_connection(&self) -> bool {
        // No cheap read-only endpoint; a one-token completion proves the key works
        let probe = ChatRequest::new(vec![ChatMessage::user("ping")]).with_max_tokens(1);
        match self.send_chat_completion(&probe).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(vendor = VENDOR, error = %e, "Connection test failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LLMError> {
        Ok(KNOWN_MODELS.iter().map(|m| m.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_messages_hoisted_and_joined() {
        let messages = vec![
            ChatMessage::system("Be brief."),
            ChatMessage::user("Hi"),
            ChatMessage::system("Answer in English."),
            ChatMessage::assistant("Hello"),
        ];
        let (system, conversation) = split_system(&messages);

        assert_eq!(system.as_deref(), Some("Be brief.\n\nAnswer in English."));
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[0].role, "user");
        assert_eq!(conversation[1].role, "assistant");
    }

    #[test]
    fn test_no_system_field_without_system_messages() {
        let messages = vec![ChatMessage::user("Hi")];
        let (system, _) = split_system(&messages);
        assert!(system.is_none());
    }

    #[test]
    fn test_stream_event_parsing() {
        let delta = r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        assert_eq!(parse_stream_line(delta).unwrap(), Some(StreamEvent::Delta("Hi".into())));
        assert_eq!(parse_stream_line("event: content_block_delta").unwrap(), None);
        assert_eq!(
            parse_stream_line(r#"data: {"type":"message_stop"}"#).unwrap(),
            Some(StreamEvent::Done)
        );
        assert!(parse_stream_line(
            r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_list_models_is_static() {
        let adapter = AnthropicAdapter::new(
            "https://api.anthropic.com",
            "sk-ant".into(),
            "claude-3-5-sonnet-latest",
            4096,
            Duration::from_secs(5),
        )
        .unwrap();
        let models = adapter.list_models().await.unwrap();
        assert!(models.contains(&"claude-3-5-sonnet-latest".to_string()));
    }
}
