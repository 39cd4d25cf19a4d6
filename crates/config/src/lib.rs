//! Configuration loading, validation, and management for metaloop.
//!
//! Loads configuration from `~/.metaloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use metaloop_core::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The root configuration structure.
///
/// Maps directly to `~/.metaloop/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the unified backend API (model listing, memory,
    /// transcripts, and the cloud chat proxy)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Base URL of the local Ollama server
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Default provider/model bindings for the two primary agents
    #[serde(default)]
    pub agents: AgentDefaults,

    /// Reflector agent configuration
    #[serde(default)]
    pub reflector: ReflectorConfig,

    /// Loop execution defaults
    #[serde(default, rename = "loop")]
    pub loop_defaults: LoopDefaults,
}

fn default_backend_url() -> String {
    "http://localhost:8000/api".into()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            ollama_url: default_ollama_url(),
            agents: AgentDefaults::default(),
            reflector: ReflectorConfig::default(),
            loop_defaults: LoopDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default = "default_provider")]
    pub provider_a: ProviderKind,

    #[serde(default)]
    pub model_a: String,

    #[serde(default = "default_provider")]
    pub provider_b: ProviderKind,

    #[serde(default)]
    pub model_b: String,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Ollama
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            provider_a: default_provider(),
            model_a: String::new(),
            provider_b: default_provider(),
            model_b: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectorConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default = "default_reflector_model")]
    pub model: String,

    /// Long-horizon goal injected into the reflector's memory context.
    #[serde(default = "default_overall_goal")]
    pub overall_goal: String,
}

fn default_reflector_model() -> String {
    "phi4-mini-reasoning:latest".into()
}
fn default_overall_goal() -> String {
    "Keep the conversation evolving: surface novel directions and avoid repetition.".into()
}

impl Default for ReflectorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_reflector_model(),
            overall_goal: default_overall_goal(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopDefaults {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    #[serde(default)]
    pub endless: bool,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_steps() -> u32 {
    8
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for LoopDefaults {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            endless: false,
            temperature: default_temperature(),
        }
    }
}

impl AppConfig {
    /// The default config directory, `~/.metaloop`.
    pub fn config_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".metaloop")
    }

    /// Load configuration from the default location, falling back to
    /// built-in defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_dir().join("config.toml"))
    }

    /// Load configuration from an explicit path.
    ///
    /// A missing file yields the defaults; a present-but-broken file is an
    /// error. `METALOOP_BACKEND_URL` and `METALOOP_OLLAMA_URL` override the
    /// file in either case.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.is_file() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            debug!(path = %path.display(), "Loaded config file");
            toml::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        if let Ok(url) = std::env::var("METALOOP_BACKEND_URL") {
            config.backend_url = url;
        }
        if let Ok(url) = std::env::var("METALOOP_OLLAMA_URL") {
            config.ollama_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate settings that cannot be expressed in the type system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend_url must not be empty".into()));
        }
        if self.ollama_url.trim().is_empty() {
            return Err(ConfigError::Invalid("ollama_url must not be empty".into()));
        }
        if self.loop_defaults.max_steps == 0 {
            return Err(ConfigError::Invalid("loop.max_steps must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.loop_defaults.temperature) {
            return Err(ConfigError::Invalid(
                "loop.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        Ok(())
    }
}
