// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Platform Configuration
//
// YAML configuration for edugen processes:
// - PostgreSQL connection settings
// - Credential encryption key (supports "env:VAR_NAME")
// - Vendor HTTP timeouts and base URLs
// - Logging

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlatformConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Secret used to derive the credential encryption key
    #[serde(default = "default_encryption_key")]
    pub encryption_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// HTTP timeout for cloud vendors (OpenAI, Anthropic)
    #[serde(default = "default_cloud_timeout")]
    pub request_timeout_secs: u64,

    /// HTTP timeout for local vendors (Ollama, LM Studio)
    #[serde(default = "default_local_timeout")]
    pub local_request_timeout_secs: u64,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,

    /// Output token cap sent to vendors that require one (Anthropic)
    #[serde(default = "default_max_output_tokens")]
    pub default_max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_max_connections() -> u32 {
    5
}

fn default_encryption_key() -> String {
    "env:EDUGEN_ENCRYPTION_KEY".to_string()
}

fn default_cloud_timeout() -> u64 {
    60
}

fn default_local_timeout() -> u64 {
    120
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encryption_key: default_encryption_key(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_cloud_timeout(),
            local_request_timeout_secs: default_local_timeout(),
            openai_base_url: default_openai_base_url(),
            anthropic_base_url: default_anthropic_base_url(),
            default_max_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LlmConfig {
    pub fn cloud_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn local_timeout(&self) -> Duration {
        Duration::from_secs(self.local_request_timeout_secs)
    }
}

/// Resolve a value that may use the "env:VAR_NAME" indirection
pub fn resolve_env_value(value: &str) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var_name) => std::env::var(var_name)
            .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
        None => Ok(value.to_string()),
    }
}

impl PlatformConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Candidate paths in precedence order (excluding the explicit CLI path)
    pub fn discovery_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(path) = std::env::var("EDUGEN_CONFIG_PATH") {
            paths.push(PathBuf::from(path));
        }

        paths.push(PathBuf::from("./edugen-config.yaml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".edugen").join("config.yaml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/edugen/config.yaml"));
        #[cfg(windows)]
        paths.push(PathBuf::from("C:\\ProgramData\\Edugen\\config.yaml"));

        paths
    }

    /// Discover configuration file using precedence order
    /// 1. EDUGEN_CONFIG_PATH environment variable
    /// 2. ./edugen-config.yaml (working directory)
    /// 3. ~/.edugen/config.yaml (user home)
    /// 4. /etc/edugen/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        Self::discovery_paths().into_iter().find(|p| p.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            return Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config from {:?}: {}", path, e));
        }

        match Self::discover_config() {
            Some(path) => {
                tracing::info!("Loading configuration from {:?}", path);
                Self::from_yaml_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Database URL with "env:" indirection resolved
    pub fn database_url(&self) -> anyhow::Result<String> {
        let url = self
            .database
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database.url is not configured"))?;
        resolve_env_value(url)
    }

    /// Encryption secret with "env:" indirection resolved
    pub fn encryption_secret(&self) -> anyhow::Result<String> {
        let secret = resolve_env_value(&self.security.encryption_key)?;
        if secret.trim().is_empty() {
            anyhow::bail!("security.encryption_key resolves to an empty value");
        }
        Ok(secret)
    }

    /// Check values that serde cannot express
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be at least 1");
        }
        if self.llm.request_timeout_secs == 0 || self.llm.local_request_timeout_secs == 0 {
            anyhow::bail!("llm timeouts must be at least 1 second");
        }
        if self.llm.default_max_tokens == 0 {
            anyhow::bail!("llm.default_max_tokens must be at least 1");
        }
        if !matches!(self.logging.format.as_str(), "json" | "text") {
            anyhow::bail!("logging.format must be \"json\" or \"text\"");
        }
        Ok(())
    }
}
