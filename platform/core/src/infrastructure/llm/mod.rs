// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Infrastructure - Anti-Corruption Layer Implementations
//
// Each adapter translates between the canonical chat contract in
// `crate::domain::llm` and one vendor wire format. Vendor failures of any
// kind leave an adapter as `LLMError::ProviderRequestFailed`.

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAICompatibleAdapter;

use std::time::Duration;

use crate::domain::llm::LLMError;

/// Longest vendor error body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 500;

pub(crate) fn build_client(vendor: &'static str, timeout: Duration) -> Result<reqwest::Client, LLMError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LLMError::request_failed(vendor, format!("Failed to build HTTP client: {}", e)))
}

/// Strip trailing slashes and a trailing `/v1` so paths can be appended
pub(crate) fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed.strip_suffix("/v1").unwrap_or(trimmed).to_string()
}

pub(crate) fn network_error(vendor: &'static str, err: reqwest::Error) -> LLMError {
    LLMError::request_failed(vendor, err.to_string())
}

/// Pass successful responses through; fold anything else into an error
/// carrying the status and the start of the body
pub(crate) async fn ensure_success(
    vendor: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, LLMError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    Err(LLMError::request_failed(vendor, format!("HTTP {}: {}", status, body)))
}

/// Splits a chunked byte stream into lines. Chunks may end mid-line and
/// mid-codepoint, so bytes are buffered until a newline arrives.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub(crate) fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=pos).collect();
        Some(decode_line(&line))
    }

    /// Remaining bytes once the stream has ended
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

/// Payload of an SSE `data:` line
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// One decoded line of a vendor event stream
#[derive(Debug, PartialEq)]
pub(crate) enum StreamEvent {
    Delta(String),
    Done,
}
