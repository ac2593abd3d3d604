// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod ai_gateway;
pub mod generation;
pub mod provider_factory;
pub mod provider_management;

// Re-export services for convenience
pub use ai_gateway::{AIGatewayService, ChatGateway, GatewayCompletion, GatewayError};
pub use generation::{
    CurriculumGenerator, ExerciseGenerator, ExerciseRequest, GenerationError, GenerationPipeline,
    QuizGenerator, ReviewGenerator,
};
pub use provider_factory::{AdapterFactory, FactoryError, StandardProviderFactory};
pub use provider_management::{
    NewModelDescriptor, NewProviderConfig, ProviderConfigUpdate, ProviderError,
    ProviderManagementService, StandardProviderManagementService,
};
