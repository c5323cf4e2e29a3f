use std::sync::Arc;

use crate::audit::{ApprovalLogger, LogEntry};
use crate::decision::{Decision, DecisionLayer as DecisionLayerEnum, LayeredDecision};
use crate::error::DecisionError;
use crate::layers::DecisionLayer;
use crate::layers::cache::{CachedVerdict, DecisionCache};
use crate::layers::fast_path::FastPathLayer;
use crate::layers::reasoning::{LlmEvaluator, ReasoningLayer};
use crate::request::ToolRequest;

/// The decision engine -- runs a request through the layer cascade.
///
/// Layers are consulted in a fixed order: fast path, cache, reasoning. The
/// first layer to produce a decision ends the cascade. Fresh Allow/Deny
/// verdicts from the reasoning layer are written through to the cache, and
/// every final decision is appended to the approval log when one is configured.
pub struct DecisionEngine {
    fast_path: FastPathLayer,
    cache: Option<DecisionCache>,
    reasoning: ReasoningLayer,
    logger: Option<ApprovalLogger>,
}

impl DecisionEngine {
    /// An engine with the built-in fast path and no cache or log.
    pub fn new(evaluator: Arc<dyn LlmEvaluator>) -> Self {
        Self {
            fast_path: FastPathLayer::with_defaults(),
            cache: None,
            reasoning: ReasoningLayer::new(evaluator),
            logger: None,
        }
    }

    pub fn with_cache(mut self, cache: DecisionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_logger(mut self, logger: ApprovalLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn cache(&self) -> Option<&DecisionCache> {
        self.cache.as_ref()
    }

    /// Evaluate a request and record the outcome.
    ///
    /// Only configuration and provider failures are returned; the engine never
    /// substitutes a default verdict for them.
    pub async fn evaluate(&self, request: &ToolRequest) -> Result<LayeredDecision, DecisionError> {
        let result = self.run_cascade(request).await?;

        if let Some(logger) = &self.logger {
            logger.log(&LogEntry::new(request, &result.decision)).await;
        }

        Ok(result)
    }

    async fn run_cascade(&self, request: &ToolRequest) -> Result<LayeredDecision, DecisionError> {
        let mut layers: Vec<(&dyn DecisionLayer, DecisionLayerEnum)> = vec![(
            &self.fast_path as &dyn DecisionLayer,
            DecisionLayerEnum::FastPath,
        )];
        if let Some(cache) = &self.cache {
            layers.push((cache as &dyn DecisionLayer, DecisionLayerEnum::Cache));
        }
        layers.push((
            &self.reasoning as &dyn DecisionLayer,
            DecisionLayerEnum::Reasoning,
        ));

        for (layer, layer_enum) in layers {
            tracing::debug!(
                tool = %request.tool_name,
                layer = layer.name(),
                "Evaluating layer"
            );

            match layer.evaluate(request).await {
                Ok(Some(decision)) => {
                    tracing::info!(
                        tool = %request.tool_name,
                        layer = layer.name(),
                        decision = %decision.kind(),
                        "Layer produced decision"
                    );

                    if layer_enum == DecisionLayerEnum::Reasoning && decision.is_terminal() {
                        self.write_through(request, &decision).await;
                    }

                    return Ok(LayeredDecision {
                        decision,
                        layer: layer_enum,
                    });
                }
                Ok(None) => {
                    tracing::debug!(
                        tool = %request.tool_name,
                        layer = layer.name(),
                        "Layer passed through"
                    );
                }
                Err(e) if e.is_fatal() => {
                    tracing::warn!(
                        tool = %request.tool_name,
                        layer = layer.name(),
                        error = %e,
                        "Layer failed"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        tool = %request.tool_name,
                        layer = layer.name(),
                        error = %e,
                        "Layer error, skipping"
                    );
                }
            }
        }

        // The reasoning layer always decides or fails, so this is unreachable
        // in practice. Refuse to invent a verdict.
        Err(DecisionError::Provider(
            "no layer produced a decision".into(),
        ))
    }

    /// Persist a fresh Allow/Deny verdict. Ask is never cached.
    async fn write_through(&self, request: &ToolRequest, decision: &Decision) {
        let Some(cache) = &self.cache else {
            return;
        };
        let Some(verdict) = CachedVerdict::from_decision(decision) else {
            return;
        };

        if let Err(e) = cache
            .put(
                &request.tool_name,
                &request.tool_input,
                &request.working_directory,
                verdict,
                decision.reason(),
            )
            .await
        {
            tracing::warn!(
                tool = %request.tool_name,
                error = %e,
                "Cache write-through failed"
            );
        }
    }
}
