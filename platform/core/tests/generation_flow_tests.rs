// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use edugen_core::application::ai_gateway::{AIGatewayService, GatewayError};
use edugen_core::application::generation::{
    CurriculumGenerator, ExerciseGenerator, ExerciseRequest, GenerationError, GenerationPipeline,
    QuizGenerator, ReviewGenerator,
};
use edugen_core::application::provider_factory::{AdapterFactory, FactoryError};
use edugen_core::domain::artifact::{FindingSeverity, Provenance, ExerciseHint};
use edugen_core::domain::curriculum::{
    Curriculum, CurriculumId, DifficultyLevel, Exercise, ExerciseId, Topic, TopicId,
};
use edugen_core::domain::llm::{
    ChatRequest, ChatResponse, ChatStream, FinishReason, LLMError, LLMProvider, TokenUsage,
};
use edugen_core::domain::provider::{ModelDescriptor, ProviderConfig, UserId};
use edugen_core::domain::repository::{
    ArtifactRepository, ModelRepository, ProviderConfigRepository,
};
use edugen_core::infrastructure::repositories::{
    InMemoryContentRepository, InMemoryProviderRepository, InMemoryUsageRepository,
};
use edugen_core::infrastructure::ResponseRepairPipeline;

/// Replays canned completions in order and counts vendor calls
struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<String>>>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn vendor(&self) -> &'static str {
        "openai"
    }

    fn default_model(&self) -> &str {
        "gpt-4o"
    }

    async fn send_chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, LLMError> {
        request.validate()?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = self
            .replies
            .lock()
            .pop_front()
            .ok_or_else(|| LLMError::request_failed("openai", "no scripted reply left"))?;
        Ok(ChatResponse {
            content,
            model: request.model_or("gpt-4o").to_string(),
            usage: TokenUsage::new(1000, 500),
            finish_reason: FinishReason::Stop,
            latency_ms: 12,
        })
    }

    async fn stream_chat_completion(&self, _request: &ChatRequest) -> Result<ChatStream, LLMError> {
        Err(LLMError::request_failed("openai", "streaming not scripted"))
    }

    async fn test_connection(&self) -> bool {
        true
    }

    async fn list_models(&self) -> Result<Vec<String>, LLMError> {
        Ok(vec!["gpt-4o".into()])
    }
}

#[derive(Default)]
struct ScriptedFactory {
    replies: Arc<Mutex<VecDeque<String>>>,
    vendor_calls: Arc<AtomicUsize>,
    adapters_created: AtomicUsize,
}

impl ScriptedFactory {
    fn reply(&self, text: &str) {
        self.replies.lock().push_back(text.to_string());
    }
}

impl AdapterFactory for ScriptedFactory {
    fn create_adapter(&self, _config: &ProviderConfig) -> Result<Arc<dyn LLMProvider>, FactoryError> {
        self.adapters_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedProvider {
            replies: self.replies.clone(),
            calls: self.vendor_calls.clone(),
        }))
    }
}

struct Harness {
    user: UserId,
    provider: ProviderConfig,
    providers: Arc<InMemoryProviderRepository>,
    usage: Arc<InMemoryUsageRepository>,
    content: Arc<InMemoryContentRepository>,
    factory: Arc<ScriptedFactory>,
    exercises: ExerciseGenerator,
    curriculum: CurriculumGenerator,
    quizzes: QuizGenerator,
    reviews: ReviewGenerator,
    topic: Topic,
    curriculum_id: CurriculumId,
}

async fn harness() -> Harness {
    let providers = Arc::new(InMemoryProviderRepository::new());
    let usage = Arc::new(InMemoryUsageRepository::new());
    let content = Arc::new(InMemoryContentRepository::new());
    let factory = Arc::new(ScriptedFactory::default());

    let user = UserId::new();
    let mut provider = ProviderConfig::new(user, "openai", "primary");
    provider.is_default = true;
    providers.save(&provider).await.unwrap();

    let mut model = ModelDescriptor::new(provider.id, "gpt-4o");
    model.input_price_per_1k = Some(0.003);
    model.output_price_per_1k = Some(0.015);
    model.is_default = true;
    providers.save_model(&model).await.unwrap();

    let curriculum_id = CurriculumId::new();
    content.insert_curriculum(Curriculum {
        id: curriculum_id,
        title: "Intro to Rust".into(),
        description: None,
        difficulty: DifficultyLevel::Beginner,
    });
    let topic = Topic {
        id: TopicId::new(),
        curriculum_id,
        title: "Ownership".into(),
        description: Some("Moves, borrows and lifetimes".into()),
        content: "Every value has a single owner.".into(),
        difficulty: DifficultyLevel::Beginner,
        order_index: 0,
    };
    content.insert_topic(topic.clone());

    let gateway = Arc::new(AIGatewayService::new(
        providers.clone(),
        providers.clone(),
        usage.clone(),
        factory.clone(),
    ));
    let pipeline = Arc::new(GenerationPipeline::new(gateway, Arc::new(ResponseRepairPipeline::new())));

    Harness {
        user,
        provider,
        providers: providers.clone(),
        usage,
        exercises: ExerciseGenerator::new(pipeline.clone(), content.clone(), content.clone()),
        curriculum: CurriculumGenerator::new(pipeline.clone(), content.clone(), content.clone()),
        quizzes: QuizGenerator::new(pipeline.clone(), content.clone(), content.clone()),
        reviews: ReviewGenerator::new(pipeline, content.clone(), content.clone()),
        content,
        factory,
        topic,
        curriculum_id,
    }
}

async fn seed_exercise(h: &Harness) -> ExerciseId {
    let exercise = Exercise {
        id: ExerciseId::new(),
        topic_id: h.topic.id,
        title: "Add two numbers".into(),
        description: "Sum a and b".into(),
        instructions: "Implement add".into(),
        starter_code: "function add(a, b) {}".into(),
        solution_code: "return a+b;".into(),
        language: "javascript".into(),
        difficulty: DifficultyLevel::Beginner,
        provenance: Provenance::manual(h.user),
        created_at: chrono::Utc::now(),
    };
    h.content.insert_exercise(&exercise).await.unwrap();
    exercise.id
}

#[tokio::test]
async fn test_hint_generation_end_to_end() {
    let h = harness().await;
    let exercise_id = seed_exercise(&h).await;

    h.factory.reply(
        "Here are your hints:\n```json\n[\"Think about the + operator\", \"Both inputs are numbers\", \"return a + b\"]\n```",
    );
    let hints = h.exercises.generate_hints(h.user, exercise_id, 3, None).await.unwrap();

    assert_eq!(h.factory.vendor_calls.load(Ordering::SeqCst), 1);
    assert_eq!(hints.len(), 3);

    let stored = h.content.list_hints(exercise_id).await.unwrap();
    let levels: Vec<i32> = stored.iter().map(|hint| hint.hint_level).collect();
    assert_eq!(levels, vec![1, 2, 3]);
    assert!(stored.iter().all(|hint| hint.provenance.generated_by_ai));
    assert!(stored.iter().all(|hint| hint.provenance.ai_provider_id == Some(h.provider.id)));
    assert_eq!(stored[0].provenance.ai_model.as_deref(), Some("gpt-4o"));
}

#[tokio::test]
async fn test_hint_regeneration_is_idempotent_and_keeps_manual_hints() {
    let h = harness().await;
    let exercise_id = seed_exercise(&h).await;
    h.content.insert_hint(ExerciseHint {
        id: uuid::Uuid::new_v4(),
        exercise_id,
        hint_level: 0,
        content: "Written by the instructor".into(),
        order_index: 0,
        provenance: Provenance::manual(h.user),
    });

    h.factory.reply(r#"["old 1", "old 2", "old 3"]"#);
    h.exercises.generate_hints(h.user, exercise_id, 3, None).await.unwrap();
    h.factory.reply(r#"["new 1", "new 2", "new 3"]"#);
    h.exercises.generate_hints(h.user, exercise_id, 3, None).await.unwrap();

    let stored = h.content.list_hints(exercise_id).await.unwrap();
    let ai: Vec<&str> = stored
        .iter()
        .filter(|hint| hint.provenance.generated_by_ai)
        .map(|hint| hint.content.as_str())
        .collect();
    assert_eq!(ai, vec!["new 1", "new 2", "new 3"]);
    assert_eq!(stored.iter().filter(|hint| !hint.provenance.generated_by_ai).count(), 1);
}

#[tokio::test]
async fn test_foreign_provider_causes_no_writes_and_no_vendor_calls() {
    let h = harness().await;
    let exercise_id = seed_exercise(&h).await;

    let stranger = UserId::new();
    let mut foreign = ProviderConfig::new(stranger, "openai", "theirs");
    foreign.is_default = true;
    h.providers.save(&foreign).await.unwrap();

    h.factory.reply(r#"["never used"]"#);
    let err = h
        .exercises
        .generate_hints(h.user, exercise_id, 1, Some(foreign.id))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GenerationError::Gateway(GatewayError::ProviderNotFound(id)) if id == foreign.id
    ));
    assert_eq!(h.factory.adapters_created.load(Ordering::SeqCst), 0);
    assert_eq!(h.factory.vendor_calls.load(Ordering::SeqCst), 0);
    assert!(h.content.list_hints(exercise_id).await.unwrap().is_empty());
    assert!(h.usage.records().is_empty());
}

#[tokio::test]
async fn test_usage_cost_is_recorded() {
    let h = harness().await;
    let exercise_id = seed_exercise(&h).await;

    h.factory.reply(r#"["one"]"#);
    h.exercises.generate_hints(h.user, exercise_id, 1, None).await.unwrap();

    let records = h.usage.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].prompt_tokens, 1000);
    assert_eq!(records[0].completion_tokens, 500);
    assert!((records[0].cost.unwrap() - 0.0105).abs() < 1e-9);
}

#[tokio::test]
async fn test_unparsable_response_persists_nothing() {
    let h = harness().await;
    let exercise_id = seed_exercise(&h).await;

    h.factory.reply("Sorry, I cannot help with that request.");
    let err = h.exercises.generate_hints(h.user, exercise_id, 3, None).await.unwrap_err();

    assert!(matches!(err, GenerationError::Unparsable(_)));
    assert!(h.content.list_hints(exercise_id).await.unwrap().is_empty());
    // The vendor call itself succeeded and is billed
    assert_eq!(h.usage.records().len(), 1);
}

#[tokio::test]
async fn test_wrong_shape_is_rejected() {
    let h = harness().await;
    let exercise_id = seed_exercise(&h).await;

    h.factory.reply(r#"{"hints": ["a", "b"]}"#);
    let err = h.exercises.generate_hints(h.user, exercise_id, 2, None).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidShape(_)));
}

#[tokio::test]
async fn test_count_out_of_range_fails_before_network() {
    let h = harness().await;
    let exercise_id = seed_exercise(&h).await;

    let err = h.exercises.generate_hints(h.user, exercise_id, 0, None).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidInput(_)));
    let err = h.quizzes.generate_quiz(h.user, h.topic.id, 21, None).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidInput(_)));
    assert_eq!(h.factory.adapters_created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exercise_generation_with_template_literals() {
    let h = harness().await;

    h.factory.reply(
        "{\"title\": \"Borrow checker\", \"description\": \"Fix the borrow\", \"instructions\": \"Make it compile\", \
\"starterCode\": `fn main() {\n    let s = String::new();\n}`, \"solutionCode\": `fn main() {\n    let s = \"ok\";\n}`}",
    );
    let request = ExerciseRequest {
        topic_id: h.topic.id,
        language: "Rust".into(),
        difficulty: None,
        focus: Some("borrowing".into()),
    };
    let exercise = h.exercises.generate_exercise(h.user, request, None).await.unwrap();

    assert_eq!(exercise.language, "rust");
    assert_eq!(exercise.difficulty, DifficultyLevel::Beginner);
    assert!(exercise.solution_code.contains("let s = \"ok\";"));
    assert!(exercise.starter_code.contains('\n'));
    assert_eq!(h.content.exercises().len(), 1);
}

#[tokio::test]
async fn test_truncated_test_case_array_is_repaired() {
    let h = harness().await;
    let exercise_id = seed_exercise(&h).await;

    h.factory.reply(
        r#"[{"input": "1 2", "expectedOutput": "3"}, {"input": "0 0", "expectedOutput": "0", "isHidden": true}, {"input": "5"#,
    );
    let cases = h.exercises.generate_test_cases(h.user, exercise_id, 3, None).await.unwrap();

    assert_eq!(cases.len(), 2);
    assert!(cases[1].is_hidden);
    assert_eq!(h.content.list_test_cases(exercise_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_quiz_is_stored_with_questions() {
    let h = harness().await;

    h.factory.reply(
        r#"{"title": "Ownership check", "questions": [
            {"question": "Can a value have two owners?", "questionType": "true_false",
             "options": [{"text": "True", "isCorrect": false}, {"text": "False", "isCorrect": true}]},
            {"question": "What does a move do?", "options": ["Copies", "Transfers ownership"], "correctAnswer": "B"}
        ]}"#,
    );
    let quiz = h.quizzes.generate_quiz(h.user, h.topic.id, 2, None).await.unwrap();

    assert_eq!(quiz.title, "Ownership check");
    assert_eq!(quiz.questions.len(), 2);
    let stored = h.content.quizzes();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].questions[1].options.iter().filter(|o| o.is_correct).count(), 1);
}

#[tokio::test]
async fn test_review_and_deep_dive() {
    let h = harness().await;

    h.factory.reply(
        r#"{"overallScore": 72, "summary": "Solid but thin", "strengths": ["clear"],
            "findings": [{"category": "completeness", "severity": "major", "title": "No borrowing examples",
                          "description": "The topic never shows a borrow."}]}"#,
    );
    let review = h.reviews.review_topic(h.user, h.topic.id, None).await.unwrap();
    assert_eq!(review.findings.len(), 1);
    assert_eq!(review.findings[0].severity, FindingSeverity::High);
    assert_eq!(h.content.topic_reviews().len(), 1);

    h.factory.reply(
        r#"{"explanation": "Borrowing is central", "examples": ["let r = &s;"], "suggestions": ["Add a section"]}"#,
    );
    let finding = review.findings[0].clone();
    let dive = h.reviews.deep_dive(h.user, h.topic.id, finding, None).await.unwrap();
    assert_eq!(dive.examples, vec!["let r = &s;"]);
    assert!(dive.provenance.generated_by_ai);
}

#[tokio::test]
async fn test_curriculum_generators() {
    let h = harness().await;

    h.factory.reply(
        r#"[{"title": "Borrowing", "difficulty": "medium", "estimatedMinutes": 40},
            {"title": "Lifetimes", "difficulty": "unknown-level"}]"#,
    );
    let suggestions = h.curriculum.suggest_topics(h.user, h.curriculum_id, 2, None).await.unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].difficulty, DifficultyLevel::Intermediate);
    assert_eq!(suggestions[1].difficulty, DifficultyLevel::Beginner);

    h.factory.reply(r#"["Explain a move", {"objective": "Apply borrowing rules", "bloomLevel": "apply"}]"#);
    let objectives = h.curriculum.generate_objectives(h.user, h.topic.id, 2, None).await.unwrap();
    assert_eq!(objectives.len(), 2);
    assert_eq!(objectives[1].bloom_level.as_deref(), Some("apply"));

    h.factory.reply(r#"{"content": "Ownership, explained simply."}"#);
    let variation = h
        .curriculum
        .generate_content_variation(h.user, h.topic.id, "Simplified", None)
        .await
        .unwrap();
    assert_eq!(variation.variation_type, "simplified");
    assert_eq!(variation.title, "Ownership (simplified)");
    assert_eq!(h.content.content_variations().len(), 1);
}

#[tokio::test]
async fn test_missing_topic_is_not_found() {
    let h = harness().await;
    let err = h.reviews.review_topic(h.user, TopicId::new(), None).await.unwrap_err();
    assert!(matches!(err, GenerationError::NotFound(_)));
    assert_eq!(h.factory.vendor_calls.load(Ordering::SeqCst), 0);
}
