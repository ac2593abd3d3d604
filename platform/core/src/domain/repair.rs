// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Contract for turning free-form LLM text into a JSON value.
//!
//! The production implementation is
//! `crate::infrastructure::response_repair::ResponseRepairPipeline`.

use serde_json::Value;

/// Pure, deterministic text-to-JSON recovery
pub trait ResponseParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<Value, RepairError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepairError {
    /// Every repair strategy failed. `preview` holds the start of the raw
    /// text for server-side logs and is deliberately left out of the message.
    #[error("AI response could not be parsed as JSON: {reason}")]
    Unparsable { reason: String, preview: String },
}

impl RepairError {
    pub fn preview(&self) -> &str {
        match self {
            RepairError::Unparsable { preview, .. } => preview,
        }
    }
}
