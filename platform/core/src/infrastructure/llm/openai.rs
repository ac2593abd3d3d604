// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI LLM Provider Adapter
//
// Anti-Corruption Layer for the OpenAI chat completions API.
// Also serves OpenAI-compatible servers (LM Studio, Ollama's /v1 shim).

use std::time::{Duration, Instant};

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::{build_client, ensure_success, network_error, normalize_base_url, sse_data, LineBuffer, StreamEvent};
use crate::domain::llm::{
    ChatRequest, ChatResponse, ChatStream, FinishReason, LLMError, LLMProvider, TokenUsage,
};

pub struct OpenAICompatibleAdapter {
    client: reqwest::Client,
    vendor: &'static str,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIDelta,
}

#[derive(Deserialize, Default)]
struct OpenAIDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIModelList {
    data: Vec<OpenAIModel>,
}

#[derive(Deserialize)]
struct OpenAIModel {
    id: String,
}

impl OpenAICompatibleAdapter {
    /// `vendor` names the adapter in errors and metrics ("openai",
    /// "lmstudio", "ollama"). The key is sent as a bearer token when present.
    pub fn new(
        vendor: &'static str,
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LLMError> {
        Ok(Self {
            client: build_client(vendor, timeout)?,
            vendor,
            base_url: normalize_base_url(base_url),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn request_body<'a>(&'a self, request: &'a ChatRequest, stream: bool) -> OpenAIRequest<'a> {
        OpenAIRequest {
            model: request.model_or(&self.model),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }

    async fn post_completion(&self, body: &OpenAIRequest<'_>) -> Result<reqwest::Response, LLMError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(self.vendor, e))?;
        ensure_success(self.vendor, response).await
    }
}

fn parse_stream_line(vendor: &'static str, line: &str) -> Result<Option<StreamEvent>, LLMError> {
    let Some(data) = sse_data(line) else {
        return Ok(None);
    };
    if data == "[DONE]" {
        return Ok(Some(StreamEvent::Done));
    }
    if data.is_empty() {
        return Ok(None);
    }

    let chunk: OpenAIStreamChunk = serde_json::from_str(data)
        .map_err(|e| LLMError::request_failed(vendor, format!("Malformed stream event: {}", e)))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty())
        .map(StreamEvent::Delta))
}

/// Text deltas from an SSE completion stream, ending at `[DONE]`
fn delta_stream(
    vendor: &'static str,
    response: reqwest::Response,
) -> impl Stream<Item = Result<String, LLMError>> + Send {
    let mut bytes = response.bytes_stream();

    try_stream! {
        let mut lines = LineBuffer::default();
        let mut done = false;

        while !done {
            let Some(chunk) = bytes.next().await else {
                break;
            };
            let chunk = chunk.map_err(|e| network_error(vendor, e))?;
            lines.push(&chunk);

            while let Some(line) = lines.next_line() {
                match parse_stream_line(vendor, &line)? {
                    Some(StreamEvent::Delta(text)) => yield text,
                    Some(StreamEvent::Done) => {
                        done = true;
                        break;
                    }
                    None => {}
                }
            }
        }

        if !done {
            if let Some(line) = lines.finish() {
                if let Some(StreamEvent::Delta(text)) = parse_stream_line(vendor, &line)? {
                    yield text;
                }
            }
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleAdapter {
    fn vendor(&self) -> &'static str {
        self.vendor
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn send_chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, LLMError> {
        request.validate()?;

        let started = Instant::now();
        let body = self.request_body(request, false);
        let response = self.post_completion(&body).await?;

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::request_failed(self.vendor, format!("Failed to parse response: {}", e)))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::request_failed(self.vendor, "No choices in response"))?;
        let content = choice.message.content.unwrap_or_default();

        // LM Studio and some proxies omit usage
        let usage = match openai_response.usage {
            Some(usage) => TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            None => TokenUsage::estimate(request.prompt_chars(), content.chars().count()),
        };

        Ok(ChatResponse {
            model: openai_response.model.unwrap_or_else(|| body.model.to_string()),
            usage,
            finish_reason: FinishReason::from_vendor(choice.finish_reason.as_deref()),
            latency_ms: started.elapsed().as_millis() as u64,
            content,
        })
    }

    async fn stream_chat_completion(&self, request: &ChatRequest) -> Result<ChatStream, LLMError> {
        request.validate()?;

        let body = self.request_body(request, true);
        let response = self.post_completion(&body).await?;
        Ok(Box::pin(delta_stream(self.vendor, response)))
    }

    async fn test_connection(&self) -> bool {
        match self.list_models().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(vendor = self.vendor, error = %e, "Connection test failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LLMError> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| network_error(self.vendor, e))?;
        let response = ensure_success(self.vendor, response).await?;

        let models: OpenAIModelList = response
            .json()
            .await
            .map_err(|e| LLMError::request_failed(self.vendor, format!("Failed to parse model list: {}", e)))?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_line_parsing() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(
            parse_stream_line("openai", line).unwrap(),
            Some(StreamEvent::Delta("Hel".into()))
        );
        assert_eq!(parse_stream_line("openai", "data: [DONE]").unwrap(), Some(StreamEvent::Done));
        assert_eq!(parse_stream_line("openai", "").unwrap(), None);
        assert_eq!(
            parse_stream_line("openai", r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn test_malformed_stream_event_is_provider_failure() {
        let err = parse_stream_line("lmstudio", "data: {not json").unwrap_err();
        assert!(matches!(err, LLMError::ProviderRequestFailed { ref vendor, .. } if vendor == "lmstudio"));
    }

    #[test]
    fn test_blank_key_is_not_sent() {
        let adapter = OpenAICompatibleAdapter::new(
            "lmstudio",
            "http://localhost:1234/v1",
            Some("  ".into()),
            "local-model",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(adapter.api_key.is_none());
        assert_eq!(adapter.base_url, "http://localhost:1234");
    }
}
