//! `ReasoningClient`: the `LlmEvaluator` backed by a remote provider.
//!
//! Builds the prompt, requests the two-field decision object (natively or via
//! the prompt, depending on the provider), and validates the answer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use hookgate_core::{Decision, DecisionError, LlmDecision, LlmEvaluator, ToolRequest};
use serde_json::{Map, Value};

use crate::config::HookgateConfig;
use crate::error::LlmError;
use crate::llm::{LlmClient, LlmMessage, LlmRequest};
use crate::prompt::{decision_schema, parse_decision, system_prompt, user_prompt};
use crate::provider::ProviderConfig;

struct ResolvedProvider {
    provider: ProviderConfig,
    client: Arc<dyn LlmClient>,
}

pub struct ReasoningClient {
    /// Resolved once at construction; a failure is reported on first use.
    resolved: Result<ResolvedProvider, String>,
    max_tokens: u32,
}

impl ReasoningClient {
    /// Resolve the provider from the config file and the process environment.
    pub fn from_config(config: &HookgateConfig) -> Self {
        Self::from_resolution(ProviderConfig::resolve(config), config)
    }

    /// Resolve with an injectable environment lookup.
    pub fn from_config_with<F>(config: &HookgateConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_resolution(ProviderConfig::resolve_with(config, env), config)
    }

    fn from_resolution(
        resolution: Result<ProviderConfig, LlmError>,
        config: &HookgateConfig,
    ) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let resolved = resolution.and_then(|provider| {
            let client = provider.build_client(timeout)?;
            Ok(ResolvedProvider { provider, client })
        });

        Self {
            resolved: resolved.map_err(|e| match e {
                LlmError::Configuration(msg) => msg,
                other => other.to_string(),
            }),
            max_tokens: config.max_tokens,
        }
    }

    /// Use a specific provider and client, e.g. a stub in tests.
    pub fn with_client(
        provider: ProviderConfig,
        client: Arc<dyn LlmClient>,
        max_tokens: u32,
    ) -> Self {
        Self {
            resolved: Ok(ResolvedProvider { provider, client }),
            max_tokens,
        }
    }

    pub fn provider(&self) -> Option<&ProviderConfig> {
        self.resolved.as_ref().ok().map(|r| &r.provider)
    }

    /// The request that would be sent for this tool call.
    pub fn build_request(
        &self,
        provider: &ProviderConfig,
        tool_name: &str,
        tool_input: &Map<String, Value>,
    ) -> LlmRequest {
        let structured = provider.supports_structured_output();
        LlmRequest {
            system_prompt: system_prompt(structured),
            messages: vec![LlmMessage {
                role: "user".into(),
                content: user_prompt(tool_name, tool_input),
            }],
            max_tokens: self.max_tokens,
            response_schema: structured.then(decision_schema),
        }
    }

    pub async fn decide(
        &self,
        tool_name: &str,
        tool_input: &Map<String, Value>,
    ) -> Result<Decision, LlmError> {
        Ok(self.query(tool_name, tool_input).await?.into_decision())
    }

    async fn query(
        &self,
        tool_name: &str,
        tool_input: &Map<String, Value>,
    ) -> Result<LlmDecision, LlmError> {
        let resolved = self
            .resolved
            .as_ref()
            .map_err(|msg| LlmError::Configuration(msg.clone()))?;

        let request = self.build_request(&resolved.provider, tool_name, tool_input);
        tracing::debug!(
            provider = resolved.provider.name(),
            model = resolved.provider.model(),
            tool = %tool_name,
            structured = request.response_schema.is_some(),
            "Querying reasoning provider"
        );

        let response = resolved.client.chat(&request).await?;
        parse_decision(&response.content)
    }
}

impl LlmEvaluator for ReasoningClient {
    fn evaluate<'a>(
        &'a self,
        request: &'a ToolRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LlmDecision, DecisionError>> + Send + 'a>> {
        Box::pin(async move {
            self.query(&request.tool_name, &request.tool_input)
                .await
                .map_err(DecisionError::from)
        })
    }
}
