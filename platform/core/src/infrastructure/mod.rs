// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure layer: vendor HTTP adapters, persistence, credential
//! encryption and the response repair pipeline.

pub mod credential_cipher;
pub mod db;
pub mod llm;
pub mod repositories;
pub mod response_repair;

pub use credential_cipher::AesGcmCredentialCipher;
pub use response_repair::ResponseRepairPipeline;
