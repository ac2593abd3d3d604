// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # edugen core
//!
//! AI provider gateway, LLM response repair and content generation for the
//! edugen learning platform.
//!
//! # Architecture
//!
//! - **domain:** canonical chat types, provider/model records, artifacts,
//!   repository contracts and errors. No I/O.
//! - **application:** provider factory, AI gateway, provider management and
//!   the content generation orchestrators.
//! - **infrastructure:** vendor HTTP adapters, response repair pipeline,
//!   credential cipher, PostgreSQL and in-memory repositories.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
