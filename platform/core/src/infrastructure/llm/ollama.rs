// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Ollama LLM Provider Adapter
//
// Anti-Corruption Layer for Ollama's native chat API.
// Supports air-gapped deployments with local models.

use std::time::{Duration, Instant};

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::{build_client, ensure_success, network_error, normalize_base_url, LineBuffer, StreamEvent};
use crate::domain::llm::{
    ChatRequest, ChatResponse, ChatStream, FinishReason, LLMError, LLMProvider, TokenUsage,
};

const VENDOR: &str = "ollama";

pub struct OllamaAdapter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    eval_count: Option<u32>,
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaTags {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl OllamaAdapter {
    pub fn new(endpoint: &str, model: impl Into<String>, timeout: Duration) -> Result<Self, LLMError> {
        Ok(Self {
            client: build_client(VENDOR, timeout)?,
            endpoint: normalize_base_url(endpoint),
            model: model.into(),
        })
    }

    fn request_body<'a>(&'a self, request: &'a ChatRequest, stream: bool) -> OllamaRequest<'a> {
        let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| OllamaOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        });

        OllamaRequest {
            model: request.model_or(&self.model),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream,
            options,
        }
    }

    async fn post_chat(&self, body: &OllamaRequest<'_>) -> Result<reqwest::Response, LLMError> {
        let url = format!("{}/api/chat", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| network_error(VENDOR, e))?;
        ensure_success(VENDOR, response).await
    }
}

/// Each NDJSON line carries a message fragment; the last one has `done: true`
fn parse_stream_line(line: &str) -> Result<Option<StreamEvent>, LLMError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let chunk: OllamaResponse = serde_json::from_str(line)
        .map_err(|e| LLMError::request_failed(VENDOR, format!("Malformed stream line: {}", e)))?;
    if let Some(error) = chunk.error {
        return Err(LLMError::request_failed(VENDOR, error));
    }

    let text = chunk.message.map(|m| m.content).filter(|t| !t.is_empty());
    match (text, chunk.done) {
        (Some(text), _) => Ok(Some(StreamEvent::Delta(text))),
        (None, true) => Ok(Some(StreamEvent::Done)),
        (None, false) => Ok(None),
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

        if !done {
            if let Some(line) = lines.finish() {
                if let Some(StreamEvent::Delta(text)) = parse_stream_line(&line)? {
                    yield text;
                }
            }
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaAdapter {
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
        let response = self.post_chat(&body).await?;

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LLMError::request_failed(VENDOR, format!("Failed to parse response: {}", e)))?;
        if let Some(error) = ollama_response.error {
            return Err(LLMError::request_failed(VENDOR, error));
        }

        let content = ollama_response
            .message
            .map(|m| m.content)
            .ok_or_else(|| LLMError::request_failed(VENDOR, "No message in response"))?;

        let usage = match (ollama_response.prompt_eval_count, ollama_response.eval_count) {
            (Some(prompt), Some(completion)) => TokenUsage::new(prompt, completion),
            _ => TokenUsage::estimate(request.prompt_chars(), content.chars().count()),
        };

        let finish_reason = match ollama_response.done_reason.as_deref() {
            Some(reason) => FinishReason::from_vendor(Some(reason)),
            None if ollama_response.done => FinishReason::Stop,
            None => FinishReason::Length,
        };

        Ok(ChatResponse {
            content,
            model: ollama_response.model.unwrap_or_else(|| body.model.to_string()),
            usage,
            finish_reason,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn stream_chat_completion(&self, request: &ChatRequest) -> Result<ChatStream, LLMError> {
        request.validate()?;

        let body = self.request_body(request, true);
        let response = self.post_chat(&body).await?;
        Ok(Box::pin(delta_stream(response)))
    }

    async fn test_connection(&self) -> bool {
        // Check if Ollama server is running by listing models
        match self.list_models().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(vendor = VENDOR, error = %e, "Connection test failed");
                false
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LLMError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(VENDOR, e))?;
        let response = ensure_success(VENDOR, response).await?;

        let tags: OllamaTags = response
            .json()
            .await
            .map_err(|e| LLMError::request_failed(VENDOR, format!("Failed to parse model list: {}", e)))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndjson_line_parsing() {
        let line = r#"{"model":"llama3.2","message":{"role":"assistant","content":"Hi"},"done":false}"#;
        assert_eq!(parse_stream_line(line).unwrap(), Some(StreamEvent::Delta("Hi".into())));

        let last = r#"{"model":"llama3.2","message":{"role":"assistant","content":""},"done":true,"eval_count":3}"#;
        assert_eq!(parse_stream_line(last).unwrap(), Some(StreamEvent::Done));

        assert!(parse_stream_line(r#"{"error":"model not found"}"#).is_err());
        assert_eq!(parse_stream_line("   ").unwrap(), None);
    }

    #[test]
    fn test_options_omitted_when_unset() {
        let adapter = OllamaAdapter::new("http://localhost:11434", "llama3.2", Duration::from_secs(5)).unwrap();
        let request = ChatRequest::new(vec![crate::domain::llm::ChatMessage::user("hi")]);
        let body = serde_json::to_value(adapter.request_body(&request, false)).unwrap();
        assert!(body.get("options").is_none());
        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["stream"], false);
    }
}
