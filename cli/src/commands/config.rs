// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use edugen_core::domain::config::PlatformConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./edugen-config.yaml)
        #[arg(short, long, default_value = "./edugen-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, force } => generate(output, force).await,
    }
}

/// Secrets are shown by source only
fn describe_secret(value: &str) -> String {
    match value.strip_prefix("env:") {
        Some(var) => format!("from ${}", var),
        None => "(inline value)".to_string(),
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = PlatformConfig::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        for (index, path) in PlatformConfig::discovery_paths().iter().enumerate() {
            let marker = if path.exists() { "✓".green() } else { " ".normal() };
            println!("  {}. {} {}", index + 2, path.display(), marker);
        }
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Database:".bold());
    match &config.database.url {
        Some(url) if url.starts_with("env:") => println!("  URL: {}", describe_secret(url)),
        Some(_) => println!("  URL: (configured)"),
        None => println!("  URL: {}", "(not set)".yellow()),
    }
    println!("  Max connections: {}", config.database.max_connections);
    println!();

    println!("{}", "Security:".bold());
    println!("  Encryption key: {}", describe_secret(&config.security.encryption_key));
    println!();

    println!("{}", "LLM:".bold());
    println!("  Cloud timeout: {}s", config.llm.request_timeout_secs);
    println!("  Local timeout: {}s", config.llm.local_request_timeout_secs);
    println!("  OpenAI base URL: {}", config.llm.openai_base_url);
    println!("  Anthropic base URL: {}", config.llm.anthropic_base_url);
    println!("  Default max tokens: {}", config.llm.default_max_tokens);
    println!();

    println!("{}", "Logging:".bold());
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = PlatformConfig::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    if config.database.url.is_some() {
        config.database_url().context("database.url could not be resolved")?;
    } else {
        println!("{}", "⚠ database.url is not set; provider and generation commands will fail".yellow());
    }
    config
        .encryption_secret()
        .context("security.encryption_key could not be resolved")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let sample = include_str!("../../templates/edugen-config.yaml");

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_and_validates() {
        let sample = include_str!("../../templates/edugen-config.yaml");
        let config = PlatformConfig::from_yaml_str(sample).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.url.as_deref(), Some("env:DATABASE_URL"));
    }

    #[test]
    fn test_describe_secret_hides_inline_values() {
        assert_eq!(describe_secret("env:EDUGEN_ENCRYPTION_KEY"), "from $EDUGEN_ENCRYPTION_KEY");
        assert_eq!(describe_secret("hunter2"), "(inline value)");
    }

    #[tokio::test]
    async fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edugen-config.yaml");

        generate(path.clone(), false).await.unwrap();
        assert!(generate(path.clone(), false).await.is_err());
        assert!(generate(path, true).await.is_ok());
    }
}
