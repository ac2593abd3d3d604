// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! AI provider management commands
//!
//! Commands: list, add, test, sync-models, set-default, remove

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::collections::HashMap;
use uuid::Uuid;

use edugen_core::application::{NewProviderConfig, ProviderManagementService};
use edugen_core::domain::config::PlatformConfig;
use edugen_core::domain::provider::ProviderConfigId;

use crate::bootstrap::{require_user, Services};

#[derive(Subcommand)]
pub enum ProviderCommand {
    /// List the acting user's providers
    List,

    /// Register a provider
    Add {
        /// Vendor: openai, anthropic, ollama, lmstudio
        #[arg(long = "type", value_name = "VENDOR")]
        provider_type: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// API key (stored encrypted)
        #[arg(long, env = "EDUGEN_PROVIDER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Base URL (required for ollama and lmstudio)
        #[arg(long)]
        endpoint: Option<String>,

        /// Make this the default provider
        #[arg(long)]
        default: bool,

        /// Vendor option, repeatable (e.g. timeout_secs=30, compatibility=openai)
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },

    /// Check that a provider is reachable with its stored credentials
    Test {
        #[arg(value_name = "PROVIDER_ID")]
        id: Uuid,
    },

    /// Refresh the model catalogue from the vendor
    SyncModels {
        #[arg(value_name = "PROVIDER_ID")]
        id: Uuid,
    },

    /// Make a provider the default
    SetDefault {
        #[arg(value_name = "PROVIDER_ID")]
        id: Uuid,
    },

    /// Delete a provider
    Remove {
        #[arg(value_name = "PROVIDER_ID")]
        id: Uuid,
    },
}

pub async fn handle_command(command: ProviderCommand, config: PlatformConfig, user: Option<Uuid>) -> Result<()> {
    let user_id = require_user(user)?;
    let services = Services::connect(&config).await?;
    let providers = &services.providers;

    match command {
        ProviderCommand::List => {
            let list = providers.list_providers(user_id).await?;
            if list.is_empty() {
                println!("{}", "No providers configured".yellow());
                return Ok(());
            }

            println!("{} providers found:", list.len());
            println!("{:<38} {:<20} {:<10} {:<8} {}", "ID", "NAME", "VENDOR", "ACTIVE", "DEFAULT");
            for provider in list {
                println!(
                    "{:<38} {:<20} {:<10} {:<8} {}",
                    provider.id,
                    provider.name,
                    provider.provider_type,
                    if provider.is_active { "yes" } else { "no" },
                    if provider.is_default { "★".yellow().to_string() } else { String::new() }
                );
            }
            Ok(())
        }
        ProviderCommand::Add {
            provider_type,
            name,
            api_key,
            endpoint,
            default,
            options,
        } => {
            let input = NewProviderConfig {
                provider_type,
                name,
                api_key,
                endpoint_url: endpoint,
                is_default: default,
                config: parse_options(&options)?,
            };
            let created = providers.create_provider(user_id, input).await?;
            println!(
                "{}",
                format!("✓ Provider registered: {} ({})", created.name, created.id).green()
            );
            if created.is_default {
                println!("  {}", "Set as default provider".dimmed());
            }
            Ok(())
        }
        ProviderCommand::Test { id } => {
            println!("{}", "Testing connection...".dimmed());
            if providers.test_connection(user_id, ProviderConfigId(id)).await? {
                println!("{}", "✓ Connection OK".green());
                Ok(())
            } else {
                println!("{}", "✗ Connection failed".red());
                anyhow::bail!("provider {} is not reachable", id)
            }
        }
        ProviderCommand::SyncModels { id } => {
            let models = providers.sync_models(user_id, ProviderConfigId(id)).await?;
            println!("{}", format!("✓ {} model(s) synced", models.len()).green());
            for model in models {
                let mut flags = Vec::new();
                if model.is_default {
                    flags.push("default");
                }
                if !model.is_available {
                    flags.push("unavailable");
                }
                println!("  - {} {}", model.model_id, flags.join(", ").dimmed());
            }
            Ok(())
        }
        ProviderCommand::SetDefault { id } => {
            let provider = providers.set_default_provider(user_id, ProviderConfigId(id)).await?;
            println!("{}", format!("✓ Default provider: {}", provider.name).green());
            Ok(())
        }
        ProviderCommand::Remove { id } => {
            providers.delete_provider(user_id, ProviderConfigId(id)).await?;
            println!("{}", format!("✓ Provider {} removed", id).green());
            Ok(())
        }
    }
}

/// `KEY=VALUE` pairs; values that parse as JSON keep their type
fn parse_options(options: &[String]) -> Result<HashMap<String, serde_json::Value>> {
    options
        .iter()
        .map(|option| {
            let (key, value) = option
                .split_once('=')
                .with_context(|| format!("Invalid option '{}': expected KEY=VALUE", option))?;
            let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            Ok((key.trim().to_string(), value))
        })
        .collect()
}
