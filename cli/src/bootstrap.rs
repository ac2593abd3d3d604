// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service wiring for commands that need the database.
//!
//! Builds the PostgreSQL repositories, credential cipher, adapter factory,
//! gateway and generators in-process from `PlatformConfig`.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use edugen_core::{
    application::{
        AIGatewayService, CurriculumGenerator, ExerciseGenerator, GenerationPipeline, QuizGenerator,
        ReviewGenerator, StandardProviderFactory, StandardProviderManagementService,
    },
    domain::{config::PlatformConfig, provider::UserId, repository::PostgresConfig},
    infrastructure::{
        credential_cipher::AesGcmCredentialCipher,
        db::Database,
        repositories::{PostgresContentRepository, PostgresProviderRepository, PostgresUsageRepository},
        response_repair::ResponseRepairPipeline,
    },
};

pub struct Services {
    pub gateway: Arc<AIGatewayService>,
    pub providers: StandardProviderManagementService,
    pub exercises: ExerciseGenerator,
    pub curriculum: CurriculumGenerator,
    pub quizzes: QuizGenerator,
    pub reviews: ReviewGenerator,
}

impl Services {
    pub async fn connect(config: &PlatformConfig) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let database_url = config.database_url()?;
        let db = Database::connect(&PostgresConfig {
            connection_string: database_url,
            max_connections: config.database.max_connections,
        })
        .await
        .context("Failed to connect to PostgreSQL")?;

        let secret = config.encryption_secret()?;
        let cipher = Arc::new(AesGcmCredentialCipher::new(&secret).context("Invalid encryption key")?);

        let provider_repo = Arc::new(PostgresProviderRepository::new(db.get_pool().clone()));
        let usage_repo = Arc::new(PostgresUsageRepository::new(db.get_pool().clone()));
        let content_repo = Arc::new(PostgresContentRepository::new(db.get_pool().clone()));

        let factory = Arc::new(StandardProviderFactory::new(cipher.clone(), config.llm.clone()));
        let gateway = Arc::new(AIGatewayService::new(
            provider_repo.clone(),
            provider_repo.clone(),
            usage_repo,
            factory.clone(),
        ));
        let providers =
            StandardProviderManagementService::new(provider_repo.clone(), provider_repo, cipher, factory);

        let pipeline = Arc::new(GenerationPipeline::new(
            gateway.clone(),
            Arc::new(ResponseRepairPipeline::new()),
        ));

        debug!("Core services wired");
        Ok(Self {
            gateway,
            providers,
            exercises: ExerciseGenerator::new(pipeline.clone(), content_repo.clone(), content_repo.clone()),
            curriculum: CurriculumGenerator::new(pipeline.clone(), content_repo.clone(), content_repo.clone()),
            quizzes: QuizGenerator::new(pipeline.clone(), content_repo.clone(), content_repo.clone()),
            reviews: ReviewGenerator::new(pipeline, content_repo.clone(), content_repo),
        })
    }
}

pub fn require_user(user: Option<Uuid>) -> Result<UserId> {
    user.map(UserId)
        .context("This command needs an acting user: pass --user <UUID> or set EDUGEN_USER_ID")
}
