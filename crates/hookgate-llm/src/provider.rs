//! Reasoning-provider selection.
//!
//! Credential slots are checked once, in a fixed order, and the winner is
//! captured as a [`ProviderConfig`]. Nothing downstream inspects raw keys.
//!
//! Precedence (first available wins):
//!
//! 1. Managed proxy: `proxyApiKey` / `HOOKGATE_PROXY_API_KEY`
//! 2. OpenAI-compatible: `openaiApiKey` / `OPENAI_API_KEY`
//! 3. Anthropic-compatible: `apiKey` / `ANTHROPIC_API_KEY`
//!
//! Setting `authMethod` restricts the search to that one slot. Within a slot
//! the config file wins over the environment.
//!
//! The config `baseUrl` belongs to the OpenAI-compatible slot, or to the
//! Anthropic slot when `authMethod` pins it. A fallthrough to Anthropic never
//! inherits an endpoint meant for OpenAI; use `ANTHROPIC_BASE_URL` there.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AuthMethod, HookgateConfig};
use crate::error::LlmError;
use crate::llm::{AnthropicClient, LlmClient, OpenAiCompatibleClient};

pub const PROXY_API_KEY_ENV: &str = "HOOKGATE_PROXY_API_KEY";
pub const PROXY_BASE_URL_ENV: &str = "HOOKGATE_PROXY_BASE_URL";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_BASE_URL_ENV: &str = "ANTHROPIC_BASE_URL";
pub const MODEL_ENV: &str = "HOOKGATE_MODEL";

pub const DEFAULT_PROXY_BASE_URL: &str = "https://proxy.hookgate.dev/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

/// The selected provider, with everything needed to build its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    ManagedProxy {
        api_key: String,
        base_url: String,
        model: String,
    },
    OpenAiCompatible {
        api_key: String,
        base_url: String,
        model: String,
    },
    AnthropicCompatible {
        api_key: String,
        base_url: String,
        model: String,
    },
}

impl ProviderConfig {
    /// Resolve from the config file and the process environment.
    pub fn resolve(config: &HookgateConfig) -> Result<Self, LlmError> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve with an injectable environment lookup.
    pub fn resolve_with<F>(config: &HookgateConfig, env: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let order: &[AuthMethod] = match config.auth_method {
            Some(AuthMethod::Proxy) => &[AuthMethod::Proxy],
            Some(AuthMethod::Openai) => &[AuthMethod::Openai],
            Some(AuthMethod::Anthropic) => &[AuthMethod::Anthropic],
            None => &[AuthMethod::Proxy, AuthMethod::Openai, AuthMethod::Anthropic],
        };

        for method in order {
            if let Some(provider) = Self::try_slot(*method, config, &env) {
                tracing::debug!(
                    provider = provider.name(),
                    model = provider.model(),
                    "Reasoning provider selected"
                );
                return Ok(provider);
            }
        }

        let hint = match config.auth_method {
            Some(AuthMethod::Proxy) => {
                format!("authMethod is proxy but neither proxyApiKey nor {PROXY_API_KEY_ENV} is set")
            }
            Some(AuthMethod::Openai) => {
                format!("authMethod is openai but neither openaiApiKey nor {OPENAI_API_KEY_ENV} is set")
            }
            Some(AuthMethod::Anthropic) => {
                format!("authMethod is anthropic but neither apiKey nor {ANTHROPIC_API_KEY_ENV} is set")
            }
            None => format!(
                "set proxyApiKey, openaiApiKey or apiKey in config.json, \
                 or {PROXY_API_KEY_ENV}, {OPENAI_API_KEY_ENV} or {ANTHROPIC_API_KEY_ENV}"
            ),
        };
        Err(LlmError::Configuration(hint))
    }

    fn try_slot<F>(method: AuthMethod, config: &HookgateConfig, env: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |configured: &Option<String>, var: &str| {
            non_empty(configured.clone()).or_else(|| non_empty(env(var)))
        };
        let model = |default: &str| {
            pick(&config.model, MODEL_ENV).unwrap_or_else(|| default.to_string())
        };

        match method {
            AuthMethod::Proxy => {
                let api_key = pick(&config.proxy_api_key, PROXY_API_KEY_ENV)?;
                Some(ProviderConfig::ManagedProxy {
                    api_key,
                    base_url: pick(&config.proxy_base_url, PROXY_BASE_URL_ENV)
                        .unwrap_or_else(|| DEFAULT_PROXY_BASE_URL.into()),
                    model: model(DEFAULT_OPENAI_MODEL),
                })
            }
            AuthMethod::Openai => {
                let api_key = pick(&config.openai_api_key, OPENAI_API_KEY_ENV)?;
                Some(ProviderConfig::OpenAiCompatible {
                    api_key,
                    base_url: pick(&config.base_url, OPENAI_BASE_URL_ENV)
                        .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into()),
                    model: model(DEFAULT_OPENAI_MODEL),
                })
            }
            AuthMethod::Anthropic => {
                let api_key = pick(&config.api_key, ANTHROPIC_API_KEY_ENV)?;
                let configured = match config.auth_method {
                    Some(AuthMethod::Anthropic) => config.base_url.clone(),
                    _ => None,
                };
                Some(ProviderConfig::AnthropicCompatible {
                    api_key,
                    base_url: pick(&configured, ANTHROPIC_BASE_URL_ENV)
                        .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.into()),
                    model: model(DEFAULT_ANTHROPIC_MODEL),
                })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::ManagedProxy { .. } => "proxy",
            ProviderConfig::OpenAiCompatible { .. } => "openai",
            ProviderConfig::AnthropicCompatible { .. } => "anthropic",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::ManagedProxy { model, .. }
            | ProviderConfig::OpenAiCompatible { model, .. }
            | ProviderConfig::AnthropicCompatible { model, .. } => model,
        }
    }

    /// Whether the provider can enforce a response schema natively.
    pub fn supports_structured_output(&self) -> bool {
        match self {
            ProviderConfig::ManagedProxy { .. } | ProviderConfig::OpenAiCompatible { .. } => true,
            ProviderConfig::AnthropicCompatible { .. } => false,
        }
    }

    pub fn build_client(&self, timeout: Duration) -> Result<Arc<dyn LlmClient>, LlmError> {
        let client: Arc<dyn LlmClient> = match self {
            ProviderConfig::ManagedProxy {
                api_key,
                base_url,
                model,
            }
            | ProviderConfig::OpenAiCompatible {
                api_key,
                base_url,
                model,
            } => Arc::new(OpenAiCompatibleClient::new(
                base_url.clone(),
                model.clone(),
                Some(api_key.clone()),
                timeout,
            )?),
            ProviderConfig::AnthropicCompatible {
                api_key,
                base_url,
                model,
            } => Arc::new(AnthropicClient::new(
                base_url.clone(),
                model.clone(),
                api_key.clone(),
                timeout,
            )?),
        };
        Ok(client)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
