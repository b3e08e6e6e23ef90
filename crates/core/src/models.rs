//! # Surveyor Models
//!
//! Centralized LLM configuration for the survey workflow.
//!
//! Settings are resolved in priority order:
//! 1. the managed secrets store (`.surveyor/secrets.toml`)
//! 2. environment variables
//! 3. documented defaults (endpoint and model only; the credential has none)
//!
//! Recognized keys:
//! - `LLM_API_KEY` (alias `OPENAI_API_KEY`) - credential
//! - `LLM_BASE_URL` - OpenAI-compatible endpoint
//! - `LLM_MODEL` - model identifier
//! - `LLM_TIMEOUT_SECS` - request timeout

use crate::error::{WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_KEY_VAR: &str = "LLM_API_KEY";
pub const API_KEY_ALIAS_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "LLM_BASE_URL";
pub const MODEL_VAR: &str = "LLM_MODEL";
pub const TIMEOUT_VAR: &str = "LLM_TIMEOUT_SECS";
pub const SECRETS_PATH_VAR: &str = "SURVEYOR_SECRETS_PATH";

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// A key/value source consulted during settings resolution
pub trait SettingsSource {
    /// Look up a raw value; empty strings count as absent
    fn get(&self, key: &str) -> Option<String>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Managed secrets store backed by a flat TOML file
///
/// ```toml
/// LLM_API_KEY = "sk-..."
/// LLM_MODEL = "gpt-4o"
/// ```
#[derive(Debug, Clone, Default)]
pub struct SecretsFile {
    values: HashMap<String, String>,
}

impl SecretsFile {
    /// Default location: `$SURVEYOR_SECRETS_PATH` or `<runtime>/secrets.toml`
    pub fn default_path() -> PathBuf {
        std::env::var(SECRETS_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::state::io::get_runtime_path().join("secrets.toml"))
    }

    /// Load the store; a missing file yields an empty store
    pub fn load(path: &Path) -> WorkflowResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::Configuration(format!(
                "failed to read secrets file {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&content).map_err(|e| {
            WorkflowError::Configuration(format!("invalid secrets file {}: {e}", path.display()))
        })
    }

    /// Parse TOML text; only string, integer and float values are kept
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let table: toml::Table = content.parse()?;
        let values = table
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    toml::Value::String(s) => s,
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    _ => return None,
                };
                Some((key, value))
            })
            .collect();
        Ok(Self { values })
    }
}

impl SettingsSource for SecretsFile {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn name(&self) -> &'static str {
        "secrets"
    }
}

/// Process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl SettingsSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

/// Resolved connection settings for the extraction client
#[derive(Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmSettings {
    /// Resolve from the default secrets file, then the environment
    pub fn from_env() -> WorkflowResult<Self> {
        let secrets = SecretsFile::load(&SecretsFile::default_path())?;
        Self::resolve(&[&secrets, &EnvSource])
    }

    /// Resolve from sources in priority order (first hit wins per key)
    pub fn resolve(sources: &[&dyn SettingsSource]) -> WorkflowResult<Self> {
        let lookup = |keys: &[&str]| -> Option<(String, &'static str)> {
            sources.iter().find_map(|source| {
                keys.iter()
                    .find_map(|key| source.get(key))
                    .map(|value| (value, source.name()))
            })
        };

        let (api_key, key_source) = lookup(&[API_KEY_VAR, API_KEY_ALIAS_VAR]).ok_or_else(|| {
            WorkflowError::Configuration(format!(
                "missing {API_KEY_VAR} (or {API_KEY_ALIAS_VAR}); set it in the secrets file, .env or environment"
            ))
        })?;

        let base_url = lookup(&[BASE_URL_VAR])
            .map(|(v, _)| v)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(WorkflowError::Configuration(format!(
                "{BASE_URL_VAR} must be an http(s) URL, got `{base_url}`"
            )));
        }

        let model = lookup(&[MODEL_VAR])
            .map(|(v, _)| v)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout_secs = match lookup(&[TIMEOUT_VAR]) {
            Some((raw, _)) => raw.parse::<u64>().map_err(|_| {
                WorkflowError::Configuration(format!("{TIMEOUT_VAR} must be a number, got `{raw}`"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        tracing::debug!(credential_source = key_source, %base_url, %model, "Resolved LLM settings");

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout_secs,
        })
    }
}

/// Per-workflow model selection
///
/// The model identifier itself comes from [`LlmSettings`]; this carries the
/// sampling parameters that are fixed per stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Override for the resolved model identifier
    #[serde(default)]
    pub model: Option<String>,
    /// Sampling temperature shared by all stages
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
        }
    }
}

impl ModelConfig {
    /// Config pinned to a specific model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
