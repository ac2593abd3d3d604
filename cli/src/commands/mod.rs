// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the edugen CLI

pub mod chat;
pub mod config;
pub mod generate;
pub mod provider;
pub mod repair;
pub mod usage;

pub use self::chat::ChatCommand;
pub use self::config::ConfigCommand;
pub use self::generate::GenerateCommand;
pub use self::provider::ProviderCommand;
pub use self::repair::RepairCommand;
pub use self::usage::UsageCommand;
