// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Offline response repair
//!
//! Runs a saved model response through the repair pipeline and optionally
//! checks it against an artifact shape. Needs no database.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;

use edugen_core::domain::artifact::{ArtifactKind, GeneratedArtifact};
use edugen_core::infrastructure::response_repair::ResponseRepairPipeline;

#[derive(Args)]
pub struct RepairCommand {
    /// Raw response file (default: stdin)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Validate the repaired JSON as this artifact (e.g. hints, quiz, topic-review)
    #[arg(short, long, value_name = "KIND")]
    kind: Option<String>,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,
}

pub async fn execute(command: RepairCommand) -> Result<()> {
    let raw = read_input(command.file.as_ref())?;
    let kind = command
        .kind
        .as_deref()
        .map(str::parse::<ArtifactKind>)
        .transpose()
        .map_err(|e| anyhow::anyhow!("{} (expected one of: {})", e, known_kinds()))?;

    let pipeline = ResponseRepairPipeline::new();
    let value = match pipeline.repair(&raw) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{}", format!("✗ {}", err).red());
            eprintln!("{}", err.preview().dimmed());
            anyhow::bail!("response could not be repaired");
        }
    };

    let rendered = if command.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    println!("{}", rendered);

    if let Some(kind) = kind {
        let artifact = GeneratedArtifact::from_value(kind, value).context("Repaired JSON has the wrong shape")?;
        eprintln!(
            "{}",
            format!("✓ Valid {} ({} item(s))", artifact.kind(), artifact.item_count()).green()
        );
    }

    Ok(())
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
        }
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read stdin")?;
            Ok(raw)
        }
    }
}

fn known_kinds() -> String {
    ArtifactKind::ALL
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_repairs_file_and_checks_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.txt");
        std::fs::write(&path, "Here you go:\n```json\n[\"first\", \"second\",]\n```").unwrap();

        let command = RepairCommand {
            file: Some(path),
            kind: Some("hints".into()),
            compact: true,
        };
        assert!(execute(command).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_shape_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.txt");
        std::fs::write(&path, "{\"title\": \"Quiz\"}").unwrap();

        let command = RepairCommand {
            file: Some(path),
            kind: Some("hints".into()),
            compact: true,
        };
        assert!(execute(command).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_kind_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.txt");
        std::fs::write(&path, "[]").unwrap();

        let command = RepairCommand {
            file: Some(path),
            kind: Some("poem".into()),
            compact: false,
        };
        let err = execute(command).await.unwrap_err();
        assert!(err.to_string().contains("test_cases"));
    }
}
