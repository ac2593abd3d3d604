// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Streaming chat through the AI gateway

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use futures::StreamExt;
use std::io::Write;
use uuid::Uuid;

use edugen_core::application::ChatGateway;
use edugen_core::domain::config::PlatformConfig;
use edugen_core::domain::llm::{ChatMessage, ChatRequest};
use edugen_core::domain::provider::ProviderConfigId;

use crate::bootstrap::{require_user, Services};

#[derive(Args)]
pub struct ChatCommand {
    /// User prompt
    #[arg(value_name = "PROMPT")]
    prompt: String,

    /// System prompt
    #[arg(short, long)]
    system: Option<String>,

    /// Provider to use (default: the user's default provider)
    #[arg(short, long, value_name = "PROVIDER_ID")]
    provider: Option<Uuid>,

    /// Model override
    #[arg(short, long)]
    model: Option<String>,

    #[arg(short, long)]
    temperature: Option<f32>,

    #[arg(long)]
    max_tokens: Option<u32>,
}

impl ChatCommand {
    fn into_request(self) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(system) = self.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(self.prompt));

        let mut request = ChatRequest::new(messages);
        request.model = self.model;
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }
}

pub async fn execute(command: ChatCommand, config: PlatformConfig, user: Option<Uuid>) -> Result<()> {
    let user_id = require_user(user)?;
    let services = Services::connect(&config).await?;

    let provider_id = command.provider.map(ProviderConfigId);
    let request = command.into_request();
    request.validate()?;

    let mut stream = services
        .gateway
        .stream_chat_completion(user_id, request, provider_id)
        .await?;

    let mut stdout = std::io::stdout();
    while let Some(delta) = stream.next().await {
        match delta {
            Ok(text) => {
                print!("{}", text);
                stdout.flush()?;
            }
            Err(e) => {
                println!();
                eprintln!("{}", format!("✗ Stream failed: {}", e).red());
                return Err(e.into());
            }
        }
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edugen_core::domain::llm::ChatRole;

    #[test]
    fn test_request_puts_system_first() {
        let command = ChatCommand {
            prompt: "Explain borrowing".into(),
            system: Some("Be brief".into()),
            provider: None,
            model: Some("gpt-4o".into()),
            temperature: Some(0.3),
            max_tokens: None,
        };
        let request = command.into_request();

        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(request.messages[1].content, "Explain borrowing");
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert!(request.validate().is_ok());
    }
}
