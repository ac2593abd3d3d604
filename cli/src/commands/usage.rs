// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! AI usage summary

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Args;
use colored::Colorize;
use uuid::Uuid;

use edugen_core::domain::config::PlatformConfig;

use crate::bootstrap::{require_user, Services};

#[derive(Args)]
pub struct UsageCommand {
    /// Only count the last N days (default: all time)
    #[arg(short, long, value_name = "DAYS")]
    days: Option<u32>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(command: UsageCommand, config: PlatformConfig, user: Option<Uuid>) -> Result<()> {
    let user_id = require_user(user)?;
    let services = Services::connect(&config).await?;

    let since = command.days.map(|days| Utc::now() - Duration::days(i64::from(days)));
    let summary = services.gateway.usage_summary(user_id, since).await?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    match command.days {
        Some(days) => println!("{}", format!("AI usage, last {} day(s):", days).bold()),
        None => println!("{}", "AI usage, all time:".bold()),
    }
    println!("  Requests: {}", summary.requests);
    if summary.failures > 0 {
        println!("  Failures: {}", summary.failures.to_string().red());
    } else {
        println!("  Failures: 0");
    }
    println!(
        "  Tokens: {} ({} prompt / {} completion)",
        summary.total_tokens, summary.prompt_tokens, summary.completion_tokens
    );
    println!("  Cost: ${:.4}", summary.total_cost);

    Ok(())
}
