use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Overrides the installation directory.
pub const HOME_ENV: &str = "HOOKGATE_HOME";

/// Per-installation state directory holding config, cache and approval log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookgatePaths {
    home: PathBuf,
}

impl HookgatePaths {
    pub fn new(home: PathBuf) -> Self {
        Self { home }
    }

    /// `$HOOKGATE_HOME`, or `~/.hookgate`.
    pub fn from_env() -> Self {
        match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => Self::new(PathBuf::from(home)),
            _ => Self::new(
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".hookgate"),
            ),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.json")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.home.join("cache.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.home.join("approvals.jsonl")
    }
}

/// Which credential slot to use, pinning provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Proxy,
    #[serde(alias = "openai-compatible")]
    Openai,
    #[serde(alias = "anthropic-compatible")]
    Anthropic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookgateConfig {
    /// Append every decision to the approval log.
    pub log: bool,
    /// Consult and populate the decision cache.
    pub cache: bool,
    pub model: Option<String>,
    pub auth_method: Option<AuthMethod>,
    /// Anthropic-compatible API key.
    pub api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Base URL for the direct (OpenAI- or Anthropic-compatible) provider.
    pub base_url: Option<String>,
    pub proxy_api_key: Option<String>,
    pub proxy_base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_tokens() -> u32 {
    256
}

impl Default for HookgateConfig {
    fn default() -> Self {
        Self {
            log: true,
            cache: true,
            model: None,
            auth_method: None,
            api_key: None,
            openai_api_key: None,
            base_url: None,
            proxy_api_key: None,
            proxy_base_url: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl HookgateConfig {
    pub fn from_file(path: &Path) -> Result<Self, LlmError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, LlmError> {
        let mut config: Self = serde_json::from_str(content)?;
        if config.timeout_secs == 0 {
            config.timeout_secs = default_timeout_secs();
        }
        if config.max_tokens == 0 {
            config.max_tokens = default_max_tokens();
        }
        Ok(config)
    }

    /// Load the configuration, degrading to defaults on any problem.
    ///
    /// A missing file is normal. An unreadable or invalid one is reported with
    /// a warning and otherwise ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Invalid configuration, using defaults"
                );
                Self::default()
            }
        }
    }
}
