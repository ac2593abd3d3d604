// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod artifact;
pub mod config;
pub mod curriculum;
pub mod llm;
pub mod provider;
pub mod repair;
pub mod repository;
pub mod usage;
