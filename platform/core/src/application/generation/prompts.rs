// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Prompt builders. Pure functions of their inputs; every prompt embeds a
//! schema example and the JSON formatting rules.

use crate::domain::artifact::ReviewFinding;
use crate::domain::curriculum::{Curriculum, DifficultyLevel, Exercise, Topic};
use crate::domain::llm::{ChatMessage, ChatRequest};

const FORMAT_RULES: &str = "Formatting rules:\n\
- Respond with JSON only, no prose before or after it.\n\
- Use double quotes for every key and string value. Never use backticks.\n\
- Encode line breaks inside strings as \\n.\n\
- Do not wrap the JSON in markdown code fences.";

/// Topic content is cut to keep prompts within small-context local models
const MAX_CONTENT_CHARS: usize = 6000;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl GenerationPrompt {
    fn new(system: impl Into<String>, user: String, temperature: f32, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            user: format!("{}\n\n{}", user, FORMAT_RULES),
            temperature,
            max_tokens: Some(max_tokens),
        }
    }

    pub fn into_request(self) -> ChatRequest {
        let request = ChatRequest::new(vec![ChatMessage::system(self.system), ChatMessage::user(self.user)])
            .with_temperature(self.temperature);
        match self.max_tokens {
            Some(max_tokens) => request.with_max_tokens(max_tokens),
            None => request,
        }
    }
}

fn clip(text: &str) -> &str {
    match text.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn describe_topic(topic: &Topic) -> String {
    let mut out = format!("Topic: {}\nDifficulty: {}\n", topic.title, topic.difficulty);
    if let Some(description) = topic.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str(&format!("Summary: {}\n", description));
    }
    if !topic.content.trim().is_empty() {
        out.push_str(&format!("Content:\n{}\n", clip(&topic.content)));
    }
    out
}

pub fn exercise_prompt(
    topic: &Topic,
    language: &str,
    difficulty: DifficultyLevel,
    focus: Option<&str>,
) -> GenerationPrompt {
    let mut user = format!(
        "Create one {difficulty} programming exercise in {language} for the topic below.\n\n{}",
        describe_topic(topic)
    );
    if let Some(focus) = focus.filter(|f| !f.trim().is_empty()) {
        user.push_str(&format!("\nThe exercise should focus on: {}\n", focus.trim()));
    }
    user.push_str(
        "\nReturn a single JSON object with exactly these keys:\n\
{\"title\": \"...\", \"description\": \"...\", \"instructions\": \"...\", \
\"starterCode\": \"...\", \"solutionCode\": \"...\"}\n\
The starter code must compile but leave the core logic unimplemented. \
The solution code must be complete and correct.",
    );

    GenerationPrompt::new(
        "You are an experienced programming instructor who writes clear, self-contained coding exercises.",
        user,
        0.7,
        4096,
    )
}

fn describe_exercise(exercise: &Exercise) -> String {
    format!(
        "Exercise: {}\nLanguage: {}\nDescription: {}\nInstructions:\n{}\nReference solution:\n{}\n",
        exercise.title, exercise.language, exercise.description, exercise.instructions, exercise.solution_code
    )
}

pub fn hints_prompt(exercise: &Exercise, num_hints: u32) -> GenerationPrompt {
    let user = format!(
        "Write {num_hints} progressive hints for the exercise below. Hint 1 is a gentle nudge; \
each later hint is more specific. No hint may reveal the full solution.\n\n{}\n\
Return a JSON array of {num_hints} strings, ordered from least to most revealing:\n\
[\"first hint\", \"second hint\"]",
        describe_exercise(exercise)
    );

    GenerationPrompt::new(
        "You are a patient tutor who helps students find answers on their own.",
        user,
        0.6,
        1024,
    )
}

pub fn test_cases_prompt(exercise: &Exercise, count: u32) -> GenerationPrompt {
    let user = format!(
        "Write {count} test cases for the exercise below. Cover normal inputs, edge cases and \
invalid inputs. The expected outputs must match the reference solution exactly.\n\n{}\n\
Return a JSON array:\n\
[{{\"input\": \"...\", \"expectedOutput\": \"...\", \"isHidden\": false, \"description\": \"...\"}}]\n\
Mark roughly a third of the cases as hidden.",
        describe_exercise(exercise)
    );

    GenerationPrompt::new(
        "You are a meticulous QA engineer writing automated tests for programming exercises.",
        user,
        0.5,
        2048,
    )
}

pub fn topic_suggestions_prompt(curriculum: &Curriculum, existing: &[Topic], count: u32) -> GenerationPrompt {
    let mut user = format!(
        "Suggest {count} new topics for the curriculum \"{}\" (level: {}).\n",
        curriculum.title, curriculum.difficulty
    );
    if let Some(description) = curriculum.description.as_deref().filter(|d| !d.trim().is_empty()) {
        user.push_str(&format!("Curriculum description: {}\n", description));
    }
    if existing.is_empty() {
        user.push_str("The curriculum has no topics yet.\n");
    } else {
        user.push_str("Existing topics, in order (do not repeat them):\n");
        for topic in existing {
            user.push_str(&format!("- {}\n", topic.title));
        }
    }
    user.push_str(
        "\nReturn a JSON array in suggested teaching order:\n\
[{\"title\": \"...\", \"description\": \"...\", \"difficulty\": \"beginner|intermediate|advanced\", \
\"estimatedMinutes\": 45, \"learningObjectives\": [\"...\"]}]",
    );

    GenerationPrompt::new(
        "You are a curriculum designer who builds well-sequenced technical courses.",
        user,
        0.7,
        2048,
    )
}

pub fn objectives_prompt(topic: &Topic, count: u32) -> GenerationPrompt {
    let user = format!(
        "Write {count} measurable learning objectives for the topic below. Start each with an \
action verb and tag it with its Bloom's taxonomy level.\n\n{}\n\
Return a JSON array:\n\
[{{\"objective\": \"...\", \"bloomLevel\": \"remember|understand|apply|analyze|evaluate|create\"}}]",
        describe_topic(topic)
    );

    GenerationPrompt::new(
        "You are an instructional designer who writes precise learning objectives.",
        user,
        0.6,
        1024,
    )
}

pub fn content_variation_prompt(topic: &Topic, variation_type: &str) -> GenerationPrompt {
    let user = format!(
        "Rewrite the topic content below as a \"{variation_type}\" variation. Keep it technically \
accurate and use markdown inside the content string.\n\n{}\n\
Return a JSON object:\n\
{{\"title\": \"...\", \"content\": \"...\"}}",
        describe_topic(topic)
    );

    GenerationPrompt::new(
        "You are a technical writer who adapts learning material for different audiences.",
        user,
        0.8,
        4096,
    )
}

pub fn quiz_prompt(topic: &Topic, num_questions: u32) -> GenerationPrompt {
    let user = format!(
        "Write a quiz with {num_questions} questions on the topic below. Mix multiple-choice and \
true/false questions. Every multiple-choice question has exactly one correct option.\n\n{}\n\
Return a JSON object:\n\
{{\"title\": \"...\", \"questions\": [{{\"question\": \"...\", \"questionType\": \"multiple_choice\", \
\"options\": [{{\"text\": \"...\", \"isCorrect\": true}}, {{\"text\": \"...\", \"isCorrect\": false}}], \
\"explanation\": \"...\", \"points\": 1}}]}}",
        describe_topic(topic)
    );

    GenerationPrompt::new(
        "You are an assessment author who writes fair, unambiguous quiz questions.",
        user,
        0.6,
        4096,
    )
}

pub fn review_prompt(topic: &Topic) -> GenerationPrompt {
    let user = format!(
        "Review the learning content below for accuracy, clarity, completeness and pedagogy.\n\n{}\n\
Return a JSON object:\n\
{{\"overallScore\": 0-100, \"summary\": \"...\", \"strengths\": [\"...\"], \
\"findings\": [{{\"category\": \"accuracy|clarity|completeness|pedagogy\", \
\"severity\": \"critical|high|medium|low\", \"title\": \"...\", \"description\": \"...\", \
\"suggestion\": \"...\", \"location\": \"...\"}}]}}",
        describe_topic(topic)
    );

    GenerationPrompt::new(
        "You are a senior technical editor reviewing course material. Be specific and constructive.",
        user,
        0.4,
        3072,
    )
}

pub fn deep_dive_prompt(topic: &Topic, finding: &ReviewFinding) -> GenerationPrompt {
    let mut user = format!(
        "A review of the topic below raised this {} finding in the \"{}\" category:\n\
Title: {}\nDescription: {}\n",
        finding.severity.as_str(),
        finding.category,
        finding.title,
        finding.description
    );
    if let Some(location) = &finding.location {
        user.push_str(&format!("Location: {}\n", location));
    }
    user.push_str(&format!(
        "\nExplain the problem in depth, give concrete examples, and propose fixes.\n\n{}\n\
Return a JSON object:\n\
{{\"explanation\": \"...\", \"examples\": [\"...\"], \"suggestions\": [\"...\"], \
\"revisedContent\": \"optional rewritten passage\"}}",
        describe_topic(topic)
    ));

    GenerationPrompt::new(
        "You are a senior technical editor explaining a review finding to the content author.",
        user,
        0.5,
        2048,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::curriculum::{CurriculumId, TopicId};
    use crate::domain::llm::ChatRole;

    fn topic() -> Topic {
        Topic {
            id: TopicId::new(),
            curriculum_id: CurriculumId::new(),
            title: "Closures".into(),
            description: Some("Functions that capture their environment".into()),
            content: "A closure is ...".into(),
            difficulty: DifficultyLevel::Intermediate,
            order_index: 0,
        }
    }

    #[test]
    fn test_prompts_are_deterministic() {
        let topic = topic();
        assert_eq!(quiz_prompt(&topic, 5), quiz_prompt(&topic, 5));
        assert_eq!(review_prompt(&topic), review_prompt(&topic));
    }

    #[test]
    fn test_every_prompt_carries_format_rules() {
        let topic = topic();
        for prompt in [
            exercise_prompt(&topic, "rust", DifficultyLevel::Beginner, None),
            objectives_prompt(&topic, 3),
            content_variation_prompt(&topic, "simplified"),
            quiz_prompt(&topic, 5),
            review_prompt(&topic),
        ] {
            assert!(prompt.user.contains("double quotes"));
            assert!(prompt.user.contains("code fences"));
        }
    }

    #[test]
    fn test_temperatures() {
        let topic = topic();
        assert_eq!(review_prompt(&topic).temperature, 0.4);
        assert_eq!(content_variation_prompt(&topic, "visual").temperature, 0.8);
        assert_eq!(exercise_prompt(&topic, "go", DifficultyLevel::Advanced, None).temperature, 0.7);
    }

    #[test]
    fn test_into_request_orders_system_first() {
        let request = objectives_prompt(&topic(), 4).into_request();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(request.messages[1].role, ChatRole::User);
        assert_eq!(request.max_tokens, Some(1024));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_focus_is_included() {
        let prompt = exercise_prompt(&topic(), "python", DifficultyLevel::Beginner, Some("recursion"));
        assert!(prompt.user.contains("focus on: recursion"));
        assert!(prompt.user.contains("python"));
    }
}
