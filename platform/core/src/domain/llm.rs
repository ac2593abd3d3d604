// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Canonical Chat Completion Contract
//!
//! Vendor-agnostic request/response types and the [`LLMProvider`] interface
//! every vendor adapter implements. Adapters live in
//! `crate::infrastructure::llm` and translate between these types and the
//! vendor wire formats.
//!
//! Requests are validated locally with [`ChatRequest::validate`] before any
//! network traffic; a violation surfaces as [`LLMError::InvalidRequest`].

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// Stream of text deltas produced by a streaming chat completion.
///
/// Dropping the stream abandons the underlying HTTP response.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

/// Domain interface for LLM vendors
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Vendor name used in errors, logs and metrics (e.g. "openai")
    fn vendor(&self) -> &'static str;

    /// Model used when the request does not name one
    fn default_model(&self) -> &str;

    /// Send a chat completion and wait for the full response
    async fn send_chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, LLMError>;

    /// Send a chat completion and receive text deltas as they arrive
    async fn stream_chat_completion(&self, request: &ChatRequest) -> Result<ChatStream, LLMError>;

    /// Cheap probe; any failure is reported as `false`
    async fn test_connection(&self) -> bool;

    /// Model identifiers the vendor exposes
    async fn list_models(&self) -> Result<Vec<String>, LLMError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Canonical chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Ordered conversation, must not be empty
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature in `[0, 2]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum output tokens, at least 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Vendor model identifier; the provider default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            model: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Check request invariants before dispatch
    pub fn validate(&self) -> Result<(), LLMError> {
        if self.messages.is_empty() {
            return Err(LLMError::InvalidRequest("messages must not be empty".into()));
        }

        for (index, message) in self.messages.iter().enumerate() {
            if message.content.trim().is_empty() {
                return Err(LLMError::InvalidRequest(format!(
                    "message {} ({}) has empty content",
                    index, message.role
                )));
            }
        }

        if let Some(temperature) = self.temperature {
            if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
                return Err(LLMError::InvalidRequest(format!(
                    "temperature must be between 0 and 2, got {}",
                    temperature
                )));
            }
        }

        if self.max_tokens == Some(0) {
            return Err(LLMError::InvalidRequest("max_tokens must be at least 1".into()));
        }

        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(LLMError::InvalidRequest("model must not be blank".into()));
            }
        }

        Ok(())
    }

    /// Model to send to the vendor
    pub fn model_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(fallback)
    }

    /// Total characters across all messages, used for token estimates
    pub fn prompt_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content.chars().count()).sum()
    }
}

/// Canonical chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,

    /// Model identifier reported by the vendor
    pub model: String,

    pub usage: TokenUsage,

    pub finish_reason: FinishReason,

    pub latency_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Length-based estimate for vendors that do not report usage
    pub fn estimate(prompt_chars: usize, completion_chars: usize) -> Self {
        Self::new(estimate_tokens(prompt_chars), estimate_tokens(completion_chars))
    }
}

/// Roughly one token per four characters, rounded up
pub fn estimate_tokens(chars: usize) -> u32 {
    u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
}

/// Reason why generation stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural completion
    Stop,

    /// Hit the output token limit
    Length,

    /// Blocked by content filter
    ContentFilter,

    /// Vendor reported something else
    Other(String),
}

impl FinishReason {
    pub fn from_vendor(reason: Option<&str>) -> Self {
        match reason {
            None | Some("stop") | Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("length") | Some("max_tokens") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }
}

/// Errors surfaced by adapters. Vendor-specific failures are always folded
/// into `ProviderRequestFailed`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LLMError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{vendor} request failed: {message}")]
    ProviderRequestFailed { vendor: String, message: String },
}

impl LLMError {
    pub fn request_failed(vendor: &str, message: impl Into<String>) -> Self {
        LLMError::ProviderRequestFailed {
            vendor: vendor.to_string(),
            message: message.into(),
        }
    }
}
