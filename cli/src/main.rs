// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # edugen operator CLI
//!
//! The `edugen` binary wires the core services from configuration and
//! exposes them to operators.
//!
//! ## Commands
//!
//! - `edugen config show|validate|generate` - Configuration management
//! - `edugen repair [FILE] --kind <KIND>` - Run the response repair pipeline offline
//! - `edugen provider list|add|test|sync-models|set-default|remove` - AI provider management
//! - `edugen chat <PROMPT>` - Stream a completion from a provider
//! - `edugen generate <ARTIFACT>` - Generate and persist learning content
//! - `edugen usage` - AI usage summary
//!
//! Commands that touch providers, content or usage need `database.url`
//! and an acting user (`--user` / `EDUGEN_USER_ID`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use uuid::Uuid;

mod bootstrap;
mod commands;

use commands::{ConfigCommand, GenerateCommand, ProviderCommand};
use edugen_core::domain::config::PlatformConfig;

/// edugen - AI-assisted learning content generation
#[derive(Parser)]
#[command(name = "edugen")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "EDUGEN_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Acting user for provider, generation and usage commands
    #[arg(long, global = true, env = "EDUGEN_USER_ID", value_name = "UUID")]
    user: Option<Uuid>,

    /// Log level (trace, debug, info, warn, error); defaults to logging.level
    #[arg(long, global = true, env = "EDUGEN_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Repair a raw model response into JSON
    #[command(name = "repair")]
    Repair {
        #[command(flatten)]
        command: commands::RepairCommand,
    },

    /// AI provider management
    #[command(name = "provider")]
    Provider {
        #[command(subcommand)]
        command: ProviderCommand,
    },

    /// Stream a chat completion
    #[command(name = "chat")]
    Chat {
        #[command(flatten)]
        command: commands::ChatCommand,
    },

    /// Generate learning content
    #[command(name = "generate")]
    Generate {
        #[command(subcommand)]
        command: GenerateCommand,
    },

    /// Show AI usage for the acting user
    #[command(name = "usage")]
    Usage {
        #[command(flatten)]
        command: commands::UsageCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // `config validate` reports load errors itself
    let config = match &cli.command {
        Some(Commands::Config { .. }) => PlatformConfig::load_or_default(cli.config.clone()).unwrap_or_default(),
        _ => PlatformConfig::load_or_default(cli.config.clone()).context("Failed to load configuration")?,
    };

    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level), &config.logging.format)?;

    match cli.command {
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        Some(Commands::Repair { command }) => commands::repair::execute(command).await,
        Some(Commands::Provider { command }) => {
            commands::provider::handle_command(command, config, cli.user).await
        }
        Some(Commands::Chat { command }) => commands::chat::execute(command, config, cli.user).await,
        Some(Commands::Generate { command }) => {
            commands::generate::handle_command(command, config, cli.user).await
        }
        Some(Commands::Usage { command }) => commands::usage::execute(command, config, cli.user).await,
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
