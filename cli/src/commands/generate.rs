// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Content generation commands
//!
//! Commands: exercise, hints, test-cases, topics, objectives, quiz, review,
//! deep-dive, variation. Results are printed as JSON on stdout.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use uuid::Uuid;

use edugen_core::application::ExerciseRequest;
use edugen_core::domain::artifact::ReviewFinding;
use edugen_core::domain::config::PlatformConfig;
use edugen_core::domain::curriculum::{CurriculumId, DifficultyLevel, ExerciseId, TopicId};
use edugen_core::domain::provider::ProviderConfigId;

use crate::bootstrap::{require_user, Services};

#[derive(Subcommand)]
pub enum GenerateCommand {
    /// Generate a coding exercise for a topic
    Exercise {
        #[arg(long, value_name = "TOPIC_ID")]
        topic: Uuid,

        /// Programming language
        #[arg(short, long)]
        language: String,

        /// beginner, intermediate or advanced (default: the topic's)
        #[arg(short, long, value_parser = parse_difficulty)]
        difficulty: Option<DifficultyLevel>,

        /// Concept the exercise should practise
        #[arg(long)]
        focus: Option<String>,

        #[command(flatten)]
        target: Target,
    },

    /// Regenerate the AI hints of an exercise
    Hints {
        #[arg(long, value_name = "EXERCISE_ID")]
        exercise: Uuid,

        #[arg(short = 'n', long, default_value = "3")]
        count: u32,

        #[command(flatten)]
        target: Target,
    },

    /// Regenerate the AI test cases of an exercise
    TestCases {
        #[arg(long, value_name = "EXERCISE_ID")]
        exercise: Uuid,

        #[arg(short = 'n', long, default_value = "5")]
        count: u32,

        #[command(flatten)]
        target: Target,
    },

    /// Suggest new topics for a curriculum (not saved)
    Topics {
        #[arg(long, value_name = "CURRICULUM_ID")]
        curriculum: Uuid,

        #[arg(short = 'n', long, default_value = "5")]
        count: u32,

        #[command(flatten)]
        target: Target,
    },

    /// Write learning objectives for a topic (not saved)
    Objectives {
        #[arg(long, value_name = "TOPIC_ID")]
        topic: Uuid,

        #[arg(short = 'n', long, default_value = "4")]
        count: u32,

        #[command(flatten)]
        target: Target,
    },

    /// Generate a quiz for a topic
    Quiz {
        #[arg(long, value_name = "TOPIC_ID")]
        topic: Uuid,

        #[arg(short = 'n', long, default_value = "10")]
        questions: u32,

        #[command(flatten)]
        target: Target,
    },

    /// Review a topic's content
    Review {
        #[arg(long, value_name = "TOPIC_ID")]
        topic: Uuid,

        #[command(flatten)]
        target: Target,
    },

    /// Expand one review finding (not saved)
    DeepDive {
        #[arg(long, value_name = "TOPIC_ID")]
        topic: Uuid,

        /// Finding as a JSON string or @file.json
        #[arg(long, value_name = "FINDING")]
        finding: String,

        #[command(flatten)]
        target: Target,
    },

    /// Rewrite a topic's content as a variation (e.g. simplified, visual)
    Variation {
        #[arg(long, value_name = "TOPIC_ID")]
        topic: Uuid,

        #[arg(long = "type", value_name = "VARIATION")]
        variation_type: String,

        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args)]
pub struct Target {
    /// Provider to use (default: the user's default provider)
    #[arg(short, long, value_name = "PROVIDER_ID")]
    provider: Option<Uuid>,
}

impl Target {
    fn provider_id(&self) -> Option<ProviderConfigId> {
        self.provider.map(ProviderConfigId)
    }
}

fn parse_difficulty(s: &str) -> Result<DifficultyLevel, String> {
    s.parse()
}

/// Inline JSON or `@path` to a JSON file
fn read_json_arg<T: serde::de::DeserializeOwned>(arg: &str) -> Result<T> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("Invalid JSON")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn done(message: String) {
    eprintln!("{}", format!("✓ {}", message).green());
}

pub async fn handle_command(command: GenerateCommand, config: PlatformConfig, user: Option<Uuid>) -> Result<()> {
    let user_id = require_user(user)?;
    let services = Services::connect(&config).await?;

    match command {
        GenerateCommand::Exercise {
            topic,
            language,
            difficulty,
            focus,
            target,
        } => {
            let request = ExerciseRequest {
                topic_id: TopicId(topic),
                language,
                difficulty,
                focus,
            };
            let exercise = services
                .exercises
                .generate_exercise(user_id, request, target.provider_id())
                .await?;
            print_json(&exercise)?;
            done(format!("Exercise saved: {} ({})", exercise.title, exercise.id));
        }
        GenerateCommand::Hints { exercise, count, target } => {
            let hints = services
                .exercises
                .generate_hints(user_id, ExerciseId(exercise), count, target.provider_id())
                .await?;
            print_json(&hints)?;
            done(format!("{} hint(s) saved", hints.len()));
        }
        GenerateCommand::TestCases { exercise, count, target } => {
            let cases = services
                .exercises
                .generate_test_cases(user_id, ExerciseId(exercise), count, target.provider_id())
                .await?;
            print_json(&cases)?;
            done(format!("{} test case(s) saved", cases.len()));
        }
        GenerateCommand::Topics {
            curriculum,
            count,
            target,
        } => {
            let suggestions = services
                .curriculum
                .suggest_topics(user_id, CurriculumId(curriculum), count, target.provider_id())
                .await?;
            print_json(&suggestions)?;
            done(format!("{} topic suggestion(s)", suggestions.len()));
        }
        GenerateCommand::Objectives { topic, count, target } => {
            let objectives = services
                .curriculum
                .generate_objectives(user_id, TopicId(topic), count, target.provider_id())
                .await?;
            print_json(&objectives)?;
            done(format!("{} objective(s)", objectives.len()));
        }
        GenerateCommand::Quiz {
            topic,
            questions,
            target,
        } => {
            let quiz = services
                .quizzes
                .generate_quiz(user_id, TopicId(topic), questions, target.provider_id())
                .await?;
            print_json(&quiz)?;
            done(format!("Quiz saved: {} ({} questions)", quiz.title, quiz.questions.len()));
        }
        GenerateCommand::Review { topic, target } => {
            let review = services
                .reviews
                .review_topic(user_id, TopicId(topic), target.provider_id())
                .await?;
            print_json(&review)?;
            done(format!(
                "Review saved: score {} with {} finding(s)",
                review.overall_score,
                review.findings.len()
            ));
        }
        GenerateCommand::DeepDive { topic, finding, target } => {
            let finding: ReviewFinding = read_json_arg(&finding).context("Failed to read --finding")?;
            let deep_dive = services
                .reviews
                .deep_dive(user_id, TopicId(topic), finding, target.provider_id())
                .await?;
            print_json(&deep_dive)?;
            done("Deep dive generated".to_string());
        }
        GenerateCommand::Variation {
            topic,
            variation_type,
            target,
        } => {
            let variation = services
                .curriculum
                .generate_content_variation(user_id, TopicId(topic), &variation_type, target.provider_id())
                .await?;
            print_json(&variation)?;
            done(format!("Variation saved: {}", variation.title));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edugen_core::domain::artifact::FindingSeverity;

    #[test]
    fn test_finding_from_inline_json() {
        let finding: ReviewFinding = read_json_arg(
            r#"{"category": "accuracy", "severity": "high", "title": "Wrong output", "description": "Example prints 3"}"#,
        )
        .unwrap();
        assert_eq!(finding.severity, FindingSeverity::High);
        assert!(finding.location.is_none());
    }

    #[test]
    fn test_finding_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finding.json");
        std::fs::write(
            &path,
            r#"{"category": "clarity", "severity": "low", "title": "Jargon", "description": "Undefined term"}"#,
        )
        .unwrap();

        let finding: ReviewFinding = read_json_arg(&format!("@{}", path.display())).unwrap();
        assert_eq!(finding.category, "clarity");
    }

    #[test]
    fn test_difficulty_aliases() {
        assert_eq!(parse_difficulty("medium").unwrap(), DifficultyLevel::Intermediate);
        assert!(parse_difficulty("impossible").is_err());
    }
}
