// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Generated Artifacts
//!
//! AI-generated content goes through two representations:
//!
//! 1. **Drafts**: the loosely-shaped JSON an LLM returns, deserialized with
//!    tolerant field aliases and then checked by [`ArtifactDraft::check`].
//!    A value that does not fit fails with [`ShapeError`].
//! 2. **Records**: the typed rows persisted by
//!    `crate::domain::repository::ArtifactRepository`, each carrying a
//!    [`Provenance`].
//!
//! [`GeneratedArtifact`] is the tagged union over every draft kind.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::curriculum::{DifficultyLevel, ExerciseId, QuizId, TopicId};
use super::provider::{ProviderConfigId, UserId};

// ============================================================================
// Provenance
// ============================================================================

/// Who (and what) created a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub generated_by_ai: bool,
    pub ai_provider_id: Option<ProviderConfigId>,
    pub ai_model: Option<String>,
    pub created_by: UserId,
}

impl Provenance {
    pub fn ai(created_by: UserId, provider_id: ProviderConfigId, model: impl Into<String>) -> Self {
        Self {
            generated_by_ai: true,
            ai_provider_id: Some(provider_id),
            ai_model: Some(model.into()),
            created_by,
        }
    }

    pub fn manual(created_by: UserId) -> Self {
        Self {
            generated_by_ai: false,
            ai_provider_id: None,
            ai_model: None,
            created_by,
        }
    }
}

// ============================================================================
// Artifact kinds and shape errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ContentVariation,
    Exercise,
    Hints,
    TestCases,
    TopicSuggestions,
    LearningObjectives,
    Quiz,
    TopicReview,
    DeepDive,
}

/// Top-level JSON container an artifact kind expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Array,
    Object,
    ArrayOrObject,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 9] = [
        ArtifactKind::ContentVariation,
        ArtifactKind::Exercise,
        ArtifactKind::Hints,
        ArtifactKind::TestCases,
        ArtifactKind::TopicSuggestions,
        ArtifactKind::LearningObjectives,
        ArtifactKind::Quiz,
        ArtifactKind::TopicReview,
        ArtifactKind::DeepDive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::ContentVariation => "content_variation",
            ArtifactKind::Exercise => "exercise",
            ArtifactKind::Hints => "hints",
            ArtifactKind::TestCases => "test_cases",
            ArtifactKind::TopicSuggestions => "topic_suggestions",
            ArtifactKind::LearningObjectives => "learning_objectives",
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::TopicReview => "topic_review",
            ArtifactKind::DeepDive => "deep_dive",
        }
    }

    pub fn container(&self) -> Container {
        match self {
            ArtifactKind::Hints
            | ArtifactKind::TestCases
            | ArtifactKind::TopicSuggestions
            | ArtifactKind::LearningObjectives => Container::Array,
            ArtifactKind::Quiz => Container::ArrayOrObject,
            ArtifactKind::ContentVariation
            | ArtifactKind::Exercise
            | ArtifactKind::TopicReview
            | ArtifactKind::DeepDive => Container::Object,
        }
    }

    fn check_container(&self, value: &Value) -> Result<(), ShapeError> {
        let ok = match self.container() {
            Container::Array => value.is_array(),
            Container::Object => value.is_object(),
            Container::ArrayOrObject => value.is_array() || value.is_object(),
        };
        if ok {
            Ok(())
        } else {
            let expected = match self.container() {
                Container::Array => "an array",
                Container::Object => "an object",
                Container::ArrayOrObject => "an array or object",
            };
            Err(ShapeError::new(
                *self,
                format!("expected {}, got {}", expected, json_type_name(value)),
            ))
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ArtifactKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown artifact kind: {}", s))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parsed JSON that does not match the expected artifact shape
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {kind} response shape: {reason}")]
pub struct ShapeError {
    pub kind: ArtifactKind,
    pub reason: String,
}

impl ShapeError {
    pub fn new(kind: ArtifactKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// A draft that can be validated out of a repaired JSON value
pub trait ArtifactDraft: DeserializeOwned + Sized {
    const KIND: ArtifactKind;

    /// Semantic checks beyond what deserialization enforces
    fn check(&self) -> Result<(), ShapeError>;

    fn from_value(value: Value) -> Result<Self, ShapeError> {
        Self::KIND.check_container(&value)?;
        let draft: Self = serde_json::from_value(value)
            .map_err(|e| ShapeError::new(Self::KIND, e.to_string()))?;
        draft.check()?;
        Ok(draft)
    }
}

fn require_text(kind: ArtifactKind, field: &str, value: &str) -> Result<(), ShapeError> {
    if value.trim().is_empty() {
        Err(ShapeError::new(kind, format!("`{}` must not be empty", field)))
    } else {
        Ok(())
    }
}

fn require_items<T>(kind: ArtifactKind, items: &[T]) -> Result<(), ShapeError> {
    if items.is_empty() {
        Err(ShapeError::new(kind, "no items returned"))
    } else {
        Ok(())
    }
}

/// Accept any JSON scalar/array where text is expected
fn value_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn clamp_index(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

// ============================================================================
// Drafts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDraft {
    pub title: String,
    pub description: String,
    pub instructions: String,
    #[serde(alias = "starter_code")]
    pub starter_code: String,
    #[serde(alias = "solution_code")]
    pub solution_code: String,
}

impl ArtifactDraft for ExerciseDraft {
    const KIND: ArtifactKind = ArtifactKind::Exercise;

    fn check(&self) -> Result<(), ShapeError> {
        require_text(Self::KIND, "title", &self.title)?;
        require_text(Self::KIND, "description", &self.description)?;
        require_text(Self::KIND, "instructions", &self.instructions)?;
        require_text(Self::KIND, "solutionCode", &self.solution_code)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HintDraft {
    Text(String),
    Detailed {
        #[serde(alias = "hint", alias = "text")]
        content: String,
    },
}

impl HintDraft {
    pub fn content(&self) -> &str {
        match self {
            HintDraft::Text(content) | HintDraft::Detailed { content } => content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct HintSet(pub Vec<HintDraft>);

impl ArtifactDraft for HintSet {
    const KIND: ArtifactKind = ArtifactKind::Hints;

    fn check(&self) -> Result<(), ShapeError> {
        require_items(Self::KIND, &self.0)?;
        for hint in &self.0 {
            require_text(Self::KIND, "content", hint.content())?;
        }
        Ok(())
    }
}

impl HintSet {
    /// Hint levels follow list order, starting at 1
    pub fn into_hints(self, exercise_id: ExerciseId, provenance: &Provenance) -> Vec<ExerciseHint> {
        self.0
            .into_iter()
            .enumerate()
            .map(|(index, hint)| ExerciseHint {
                id: Uuid::new_v4(),
                exercise_id,
                hint_level: clamp_index(index + 1),
                content: hint.content().trim().to_string(),
                order_index: clamp_index(index),
                provenance: provenance.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseDraft {
    #[serde(deserialize_with = "value_as_text")]
    pub input: String,
    #[serde(alias = "expected_output", alias = "output", deserialize_with = "value_as_text")]
    pub expected_output: String,
    #[serde(default, alias = "is_hidden", alias = "hidden")]
    pub is_hidden: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TestCaseSet(pub Vec<TestCaseDraft>);

impl ArtifactDraft for TestCaseSet {
    const KIND: ArtifactKind = ArtifactKind::TestCases;

    fn check(&self) -> Result<(), ShapeError> {
        require_items(Self::KIND, &self.0)?;
        for case in &self.0 {
            require_text(Self::KIND, "expectedOutput", &case.expected_output)?;
        }
        Ok(())
    }
}

impl TestCaseSet {
    pub fn into_test_cases(
        self,
        exercise_id: ExerciseId,
        provenance: &Provenance,
    ) -> Vec<ExerciseTestCase> {
        self.0
            .into_iter()
            .enumerate()
            .map(|(index, case)| ExerciseTestCase {
                id: Uuid::new_v4(),
                exercise_id,
                input: case.input,
                expected_output: case.expected_output,
                is_hidden: case.is_hidden,
                description: case.description.filter(|d| !d.trim().is_empty()),
                order_index: clamp_index(index),
                provenance: provenance.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSuggestionDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default, alias = "estimated_minutes", alias = "durationMinutes")]
    pub estimated_minutes: Option<f64>,
    #[serde(default, alias = "learning_objectives", alias = "objectives")]
    pub learning_objectives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct TopicSuggestionSet(pub Vec<TopicSuggestionDraft>);

impl ArtifactDraft for TopicSuggestionSet {
    const KIND: ArtifactKind = ArtifactKind::TopicSuggestions;

    fn check(&self) -> Result<(), ShapeError> {
        require_items(Self::KIND, &self.0)?;
        for topic in &self.0 {
            require_text(Self::KIND, "title", &topic.title)?;
        }
        Ok(())
    }
}

impl TopicSuggestionSet {
    /// Unknown difficulty labels fall back to `fallback`
    pub fn into_suggestions(
        self,
        fallback: DifficultyLevel,
        provenance: &Provenance,
    ) -> Vec<TopicSuggestion> {
        self.0
            .into_iter()
            .enumerate()
            .map(|(index, draft)| TopicSuggestion {
                title: draft.title.trim().to_string(),
                description: draft.description.unwrap_or_default(),
                difficulty: draft
                    .difficulty
                    .as_deref()
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(fallback),
                estimated_minutes: draft
                    .estimated_minutes
                    .filter(|m| m.is_finite() && *m > 0.0)
                    .map(|m| m.round() as u32),
                learning_objectives: draft.learning_objectives,
                order_index: clamp_index(index),
                provenance: provenance.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ObjectiveDraft {
    Text(String),
    Detailed {
        #[serde(alias = "description", alias = "text")]
        objective: String,
        #[serde(default, alias = "bloomLevel", alias = "level")]
        bloom_level: Option<String>,
    },
}

impl ObjectiveDraft {
    pub fn objective(&self) -> &str {
        match self {
            ObjectiveDraft::Text(objective) | ObjectiveDraft::Detailed { objective, .. } => {
                objective
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ObjectiveSet(pub Vec<ObjectiveDraft>);

impl ArtifactDraft for ObjectiveSet {
    const KIND: ArtifactKind = ArtifactKind::LearningObjectives;

    fn check(&self) -> Result<(), ShapeError> {
        require_items(Self::KIND, &self.0)?;
        for objective in &self.0 {
            require_text(Self::KIND, "objective", objective.objective())?;
        }
        Ok(())
    }
}

impl ObjectiveSet {
    pub fn into_objectives(self, topic_id: TopicId, provenance: &Provenance) -> Vec<LearningObjective> {
        self.0
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                let objective = draft.objective().trim().to_string();
                let bloom_level = match draft {
                    ObjectiveDraft::Detailed { bloom_level, .. } => bloom_level,
                    ObjectiveDraft::Text(_) => None,
                };
                LearningObjective {
                    topic_id,
                    objective,
                    bloom_level,
                    order_index: clamp_index(index),
                    provenance: provenance.clone(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QuizOptionDraft {
    Text(String),
    Detailed {
        #[serde(alias = "optionText", alias = "option_text", alias = "option")]
        text: String,
        #[serde(default, alias = "isCorrect", alias = "is_correct")]
        correct: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionDraft {
    #[serde(alias = "questionText", alias = "question_text", alias = "text")]
    pub question: String,
    #[serde(default, alias = "question_type", alias = "type")]
    pub question_type: Option<String>,
    #[serde(default)]
    pub options: Vec<QuizOptionDraft>,
    #[serde(default, alias = "correct_answer", alias = "answer")]
    pub correct_answer: Option<Value>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub points: Option<f64>,
}

impl QuizQuestionDraft {
    pub fn resolved_type(&self) -> QuestionType {
        match self.question_type.as_deref().map(str::to_ascii_lowercase) {
            Some(t) if t.replace(['-', ' '], "_") == "true_false" => QuestionType::TrueFalse,
            _ if self.options.is_empty() && matches!(self.correct_answer, Some(Value::Bool(_))) => {
                QuestionType::TrueFalse
            }
            _ => QuestionType::MultipleChoice,
        }
    }

    /// Option texts paired with correctness. Explicit per-option flags win;
    /// otherwise `correctAnswer` is matched as a 0-based index, a letter
    /// (`"B"`) or the option text. True/false questions without options get
    /// a synthesized pair.
    pub fn resolved_options(&self) -> Vec<(String, bool)> {
        if self.options.is_empty() && self.resolved_type() == QuestionType::TrueFalse {
            let answer = match &self.correct_answer {
                Some(Value::Bool(b)) => Some(*b),
                Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Some(true),
                    "false" => Some(false),
                    _ => None,
                },
                _ => None,
            };
            return vec![
                ("True".to_string(), answer == Some(true)),
                ("False".to_string(), answer == Some(false)),
            ];
        }

        let mut options: Vec<(String, bool)> = self
            .options
            .iter()
            .map(|option| match option {
                QuizOptionDraft::Text(text) => (text.trim().to_string(), false),
                QuizOptionDraft::Detailed { text, correct } => (text.trim().to_string(), *correct),
            })
            .collect();

        if options.iter().any(|(_, correct)| *correct) {
            return options;
        }

        let correct_index = match &self.correct_answer {
            Some(Value::Number(n)) => n.as_u64().and_then(|i| usize::try_from(i).ok()),
            Some(Value::String(answer)) => {
                let answer = answer.trim();
                options
                    .iter()
                    .position(|(text, _)| text.eq_ignore_ascii_case(answer))
                    .or_else(|| letter_index(answer))
            }
            Some(Value::Bool(b)) => {
                let wanted = if *b { "true" } else { "false" };
                options.iter().position(|(text, _)| text.eq_ignore_ascii_case(wanted))
            }
            _ => None,
        };

        if let Some(option) = correct_index.and_then(|i| options.get_mut(i)) {
            option.1 = true;
        }
        options
    }
}

/// "A" -> 0, "b)" -> 1
fn letter_index(answer: &str) -> Option<usize> {
    let trimmed = answer.trim_end_matches([')', '.', ':']);
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some((c.to_ascii_uppercase() as u8 - b'A') as usize)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QuizDraft {
    Questions(Vec<QuizQuestionDraft>),
    Wrapped {
        #[serde(default)]
        title: Option<String>,
        questions: Vec<QuizQuestionDraft>,
    },
}

impl QuizDraft {
    pub fn title(&self) -> Option<&str> {
        match self {
            QuizDraft::Wrapped { title, .. } => title.as_deref(),
            QuizDraft::Questions(_) => None,
        }
    }

    pub fn questions(&self) -> &[QuizQuestionDraft] {
        match self {
            QuizDraft::Questions(questions) | QuizDraft::Wrapped { questions, .. } => questions,
        }
    }

    pub fn into_quiz(
        self,
        topic_id: TopicId,
        default_title: &str,
        difficulty: DifficultyLevel,
        provenance: &Provenance,
    ) -> Quiz {
        let title = self
            .title()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(default_title)
            .to_string();

        let questions = self
            .questions()
            .iter()
            .enumerate()
            .map(|(index, draft)| QuizQuestion {
                id: Uuid::new_v4(),
                question_text: draft.question.trim().to_string(),
                question_type: draft.resolved_type(),
                explanation: draft.explanation.clone().filter(|e| !e.trim().is_empty()),
                points: draft
                    .points
                    .filter(|p| p.is_finite() && *p >= 1.0)
                    .map(|p| p.round() as i32)
                    .unwrap_or(1),
                order_index: clamp_index(index),
                options: draft
                    .resolved_options()
                    .into_iter()
                    .enumerate()
                    .map(|(option_index, (option_text, is_correct))| QuizOption {
                        id: Uuid::new_v4(),
                        option_text,
                        is_correct,
                        order_index: clamp_index(option_index),
                    })
                    .collect(),
            })
            .collect();

        Quiz {
            id: QuizId::new(),
            topic_id,
            title,
            difficulty,
            questions,
            provenance: provenance.clone(),
            created_at: Utc::now(),
        }
    }
}

impl ArtifactDraft for QuizDraft {
    const KIND: ArtifactKind = ArtifactKind::Quiz;

    fn check(&self) -> Result<(), ShapeError> {
        require_items(Self::KIND, self.questions())?;
        for (index, question) in self.questions().iter().enumerate() {
            require_text(Self::KIND, "question", &question.question)?;
            let options = question.resolved_options();
            if options.len() < 2 {
                return Err(ShapeError::new(
                    Self::KIND,
                    format!("question {} has fewer than two options", index + 1),
                ));
            }
            if !options.iter().any(|(_, correct)| *correct) {
                return Err(ShapeError::new(
                    Self::KIND,
                    format!("question {} has no correct option", index + 1),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingDraft {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "issue", alias = "details")]
    pub description: String,
    #[serde(default, alias = "recommendation", alias = "fix")]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl FindingDraft {
    pub fn into_finding(self) -> ReviewFinding {
        let description = self.description.trim().to_string();
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| description.chars().take(80).collect());
        ReviewFinding {
            category: self
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "general".to_string()),
            severity: self
                .severity
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            title,
            description,
            suggestion: self.suggestion.filter(|s| !s.trim().is_empty()),
            location: self.location.filter(|l| !l.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    #[serde(alias = "overall_score", alias = "score")]
    pub overall_score: f64,
    pub summary: String,
    pub findings: Vec<FindingDraft>,
    #[serde(default)]
    pub strengths: Vec<String>,
}

impl ArtifactDraft for ReviewDraft {
    const KIND: ArtifactKind = ArtifactKind::TopicReview;

    fn check(&self) -> Result<(), ShapeError> {
        if !self.overall_score.is_finite() || !(0.0..=100.0).contains(&self.overall_score) {
            return Err(ShapeError::new(
                Self::KIND,
                format!("overallScore must be between 0 and 100, got {}", self.overall_score),
            ));
        }
        require_text(Self::KIND, "summary", &self.summary)?;
        for finding in &self.findings {
            let has_title = finding.title.as_deref().is_some_and(|t| !t.trim().is_empty());
            if !has_title && finding.description.trim().is_empty() {
                return Err(ShapeError::new(Self::KIND, "finding without title or description"));
            }
        }
        Ok(())
    }
}

impl ReviewDraft {
    pub fn into_review(self, topic_id: TopicId, provenance: &Provenance) -> TopicReview {
        TopicReview {
            id: Uuid::new_v4(),
            topic_id,
            overall_score: self.overall_score,
            summary: self.summary.trim().to_string(),
            findings: self.findings.into_iter().map(FindingDraft::into_finding).collect(),
            strengths: self.strengths,
            provenance: provenance.clone(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentVariationDraft {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

impl ArtifactDraft for ContentVariationDraft {
    const KIND: ArtifactKind = ArtifactKind::ContentVariation;

    fn check(&self) -> Result<(), ShapeError> {
        require_text(Self::KIND, "content", &self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepDiveDraft {
    #[serde(alias = "analysis")]
    pub explanation: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default, alias = "recommendations")]
    pub suggestions: Vec<String>,
    #[serde(default, alias = "revised_content")]
    pub revised_content: Option<String>,
}

impl ArtifactDraft for DeepDiveDraft {
    const KIND: ArtifactKind = ArtifactKind::DeepDive;

    fn check(&self) -> Result<(), ShapeError> {
        require_text(Self::KIND, "explanation", &self.explanation)
    }
}

/// Tagged union over every artifact draft
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedArtifact {
    ContentVariation(ContentVariationDraft),
    Exercise(ExerciseDraft),
    Hints(HintSet),
    TestCases(TestCaseSet),
    TopicSuggestions(TopicSuggestionSet),
    LearningObjectives(ObjectiveSet),
    Quiz(QuizDraft),
    TopicReview(ReviewDraft),
    DeepDive(DeepDiveDraft),
}

impl GeneratedArtifact {
    pub fn from_value(kind: ArtifactKind, value: Value) -> Result<Self, ShapeError> {
        Ok(match kind {
            ArtifactKind::ContentVariation => {
                GeneratedArtifact::ContentVariation(ContentVariationDraft::from_value(value)?)
            }
            ArtifactKind::Exercise => GeneratedArtifact::Exercise(ExerciseDraft::from_value(value)?),
            ArtifactKind::Hints => GeneratedArtifact::Hints(HintSet::from_value(value)?),
            ArtifactKind::TestCases => GeneratedArtifact::TestCases(TestCaseSet::from_value(value)?),
            ArtifactKind::TopicSuggestions => {
                GeneratedArtifact::TopicSuggestions(TopicSuggestionSet::from_value(value)?)
            }
            ArtifactKind::LearningObjectives => {
                GeneratedArtifact::LearningObjectives(ObjectiveSet::from_value(value)?)
            }
            ArtifactKind::Quiz => GeneratedArtifact::Quiz(QuizDraft::from_value(value)?),
            ArtifactKind::TopicReview => GeneratedArtifact::TopicReview(ReviewDraft::from_value(value)?),
            ArtifactKind::DeepDive => GeneratedArtifact::DeepDive(DeepDiveDraft::from_value(value)?),
        })
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            GeneratedArtifact::ContentVariation(_) => ArtifactKind::ContentVariation,
            GeneratedArtifact::Exercise(_) => ArtifactKind::Exercise,
            GeneratedArtifact::Hints(_) => ArtifactKind::Hints,
            GeneratedArtifact::TestCases(_) => ArtifactKind::TestCases,
            GeneratedArtifact::TopicSuggestions(_) => ArtifactKind::TopicSuggestions,
            GeneratedArtifact::LearningObjectives(_) => ArtifactKind::LearningObjectives,
            GeneratedArtifact::Quiz(_) => ArtifactKind::Quiz,
            GeneratedArtifact::TopicReview(_) => ArtifactKind::TopicReview,
            GeneratedArtifact::DeepDive(_) => ArtifactKind::DeepDive,
        }
    }

    /// Number of top-level items (questions, hints, ...) for reporting
    pub fn item_count(&self) -> usize {
        match self {
            GeneratedArtifact::Hints(set) => set.0.len(),
            GeneratedArtifact::TestCases(set) => set.0.len(),
            GeneratedArtifact::TopicSuggestions(set) => set.0.len(),
            GeneratedArtifact::LearningObjectives(set) => set.0.len(),
            GeneratedArtifact::Quiz(quiz) => quiz.questions().len(),
            GeneratedArtifact::TopicReview(review) => review.findings.len(),
            GeneratedArtifact::ContentVariation(_)
            | GeneratedArtifact::Exercise(_)
            | GeneratedArtifact::DeepDive(_) => 1,
        }
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHint {
    pub id: Uuid,
    pub exercise_id: ExerciseId,
    pub hint_level: i32,
    pub content: String,
    pub order_index: i32,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTestCase {
    pub id: Uuid,
    pub exercise_id: ExerciseId,
    pub input: String,
    pub expected_output: String,
    pub is_hidden: bool,
    pub description: Option<String>,
    pub order_index: i32,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub topic_id: TopicId,
    pub title: String,
    pub difficulty: DifficultyLevel,
    pub questions: Vec<QuizQuestion>,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub explanation: Option<String>,
    pub points: i32,
    pub order_index: i32,
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: Uuid,
    pub option_text: String,
    pub is_correct: bool,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicContentVariation {
    pub id: Uuid,
    pub topic_id: TopicId,
    /// Audience/style the variation targets (e.g. "simplified", "visual")
    pub variation_type: String,
    pub title: String,
    pub content: String,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl FindingSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingSeverity::Low => "low",
            FindingSeverity::Medium => "medium",
            FindingSeverity::High => "high",
            FindingSeverity::Critical => "critical",
        }
    }
}

impl FromStr for FindingSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" | "info" => Ok(FindingSeverity::Low),
            "medium" | "moderate" => Ok(FindingSeverity::Medium),
            "high" | "major" => Ok(FindingSeverity::High),
            "critical" | "blocker" => Ok(FindingSeverity::Critical),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub category: String,
    pub severity: FindingSeverity,
    pub title: String,
    pub description: String,
    pub suggestion: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicReview {
    pub id: Uuid,
    pub topic_id: TopicId,
    pub overall_score: f64,
    pub summary: String,
    pub findings: Vec<ReviewFinding>,
    pub strengths: Vec<String>,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

/// Suggested curriculum topic, returned to the caller for approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSuggestion {
    pub title: String,
    pub description: String,
    pub difficulty: DifficultyLevel,
    pub estimated_minutes: Option<u32>,
    pub learning_objectives: Vec<String>,
    pub order_index: i32,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningObjective {
    pub topic_id: TopicId,
    pub objective: String,
    pub bloom_level: Option<String>,
    pub order_index: i32,
    pub provenance: Provenance,
}

/// Expanded analysis of a single review finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepDive {
    pub topic_id: TopicId,
    pub finding: ReviewFinding,
    pub explanation: String,
    pub examples: Vec<String>,
    pub suggestions: Vec<String>,
    pub revised_content: Option<String>,
    pub provenance: Provenance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provenance() -> Provenance {
        Provenance::ai(UserId::new(), ProviderConfigId::new(), "gpt-4o")
    }

    #[test]
    fn test_hints_accept_strings_and_objects() {
        let value = json!(["Think about base cases", {"hint": "Use recursion", "level": 2}]);
        let set = HintSet::from_value(value).unwrap();
        let hints = set.into_hints(ExerciseId::new(), &provenance());

        assert_eq!(hints.len(), 2);
        assert_eq!(hints[0].hint_level, 1);
        assert_eq!(hints[1].hint_level, 2);
        assert_eq!(hints[1].content, "Use recursion");
        assert!(hints.iter().all(|h| h.provenance.generated_by_ai));
    }

    #[test]
    fn test_hints_require_array() {
        let err = HintSet::from_value(json!({"hints": []})).unwrap_err();
        assert_eq!(err.kind, ArtifactKind::Hints);
        assert!(err.reason.contains("expected an array"));
    }

    #[test]
    fn test_empty_hint_list_rejected() {
        assert!(HintSet::from_value(json!([])).is_err());
    }

    #[test]
    fn test_exercise_requires_all_keys() {
        let value = json!({
            "title": "Sum",
            "description": "Add numbers",
            "instructions": "Implement add",
            "starterCode": "function add(a, b) {}"
        });
        let err = ExerciseDraft::from_value(value).unwrap_err();
        assert!(err.reason.contains("solutionCode"));
    }

    #[test]
    fn test_test_case_input_coerced_to_text() {
        let value = json!([{"input": [1, 2], "expectedOutput": 3, "isHidden": true}]);
        let cases = TestCaseSet::from_value(value)
            .unwrap()
            .into_test_cases(ExerciseId::new(), &provenance());

        assert_eq!(cases[0].input, "[1,2]");
        assert_eq!(cases[0].expected_output, "3");
        assert!(cases[0].is_hidden);
    }

    #[test]
    fn test_review_shape_and_score_bounds() {
        let value = json!({
            "overallScore": 82,
            "summary": "Solid topic",
            "findings": [{"category": "clarity", "severity": "major", "description": "Jargon"}]
        });
        let review = ReviewDraft::from_value(value)
            .unwrap()
            .into_review(TopicId::new(), &provenance());
        assert_eq!(review.overall_score, 82.0);
        assert_eq!(review.findings[0].severity, FindingSeverity::High);
        assert_eq!(review.findings[0].title, "Jargon");

        let out_of_range = json!({"overallScore": 120, "summary": "x", "findings": []});
        assert!(ReviewDraft::from_value(out_of_range).is_err());

        let missing = json!({"overallScore": 50, "summary": "x"});
        assert!(ReviewDraft::from_value(missing).is_err());
    }

    #[test]
    fn test_quiz_correct_answer_resolution() {
        let value = json!({
            "title": "Loops",
            "questions": [
                {"question": "2+2?", "options": ["3", "4"], "correctAnswer": 1},
                {"question": "Pick B", "options": ["x", "y", "z"], "correctAnswer": "B"},
                {"question": "Rust is compiled", "type": "true_false", "correctAnswer": true},
                {"question": "Flags", "options": [
                    {"text": "a", "isCorrect": false},
                    {"text": "b", "isCorrect": true}
                ]}
            ]
        });
        let quiz = QuizDraft::from_value(value)
            .unwrap()
            .into_quiz(TopicId::new(), "fallback", DifficultyLevel::Beginner, &provenance());

        assert_eq!(quiz.title, "Loops");
        assert_eq!(quiz.questions.len(), 4);
        assert!(quiz.questions[0].options[1].is_correct);
        assert!(quiz.questions[1].options[1].is_correct);
        assert_eq!(quiz.questions[2].question_type, QuestionType::TrueFalse);
        assert_eq!(quiz.questions[2].options[0].option_text, "True");
        assert!(quiz.questions[2].options[0].is_correct);
        assert!(quiz.questions[3].options[1].is_correct);
        assert_eq!(quiz.questions[3].order_index, 3);
    }

    #[test]
    fn test_quiz_without_correct_option_rejected() {
        let value = json!([{"question": "?", "options": ["a", "b"]}]);
        let err = QuizDraft::from_value(value).unwrap_err();
        assert!(err.reason.contains("no correct option"));
    }

    #[test]
    fn test_generated_artifact_dispatch() {
        let artifact =
            GeneratedArtifact::from_value(ArtifactKind::LearningObjectives, json!(["Explain X"]))
                .unwrap();
        assert_eq!(artifact.kind(), ArtifactKind::LearningObjectives);
        assert_eq!(artifact.item_count(), 1);
    }

    #[test]
    fn test_artifact_kind_parsing() {
        assert_eq!("test-cases".parse::<ArtifactKind>(), Ok(ArtifactKind::TestCases));
        assert_eq!("quiz".parse::<ArtifactKind>(), Ok(ArtifactKind::Quiz));
        assert!("essay".parse::<ArtifactKind>().is_err());
    }
}
