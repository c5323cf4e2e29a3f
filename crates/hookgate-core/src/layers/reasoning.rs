use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::decision::{Decision, DecisionKind};
use crate::error::DecisionError;
use crate::layers::DecisionLayer;
use crate::request::ToolRequest;

/// Remote reasoning layer, reached only when the fast path and the cache
/// both pass through.
///
/// Unlike the cheaper layers it never passes through: it either produces a
/// decision or fails, and the failure is propagated to the caller.
pub struct ReasoningLayer {
    evaluator: Arc<dyn LlmEvaluator>,
}

/// Trait for model-backed evaluation -- abstracted so we can mock in tests and swap providers.
pub trait LlmEvaluator: Send + Sync {
    fn evaluate<'a>(
        &'a self,
        request: &'a ToolRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LlmDecision, DecisionError>> + Send + 'a>>;
}

/// The two-field structured response every provider must return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmDecision {
    pub decision: DecisionKind,
    pub reason: String,
}

impl LlmDecision {
    pub fn into_decision(self) -> Decision {
        match self.decision {
            DecisionKind::Allow => Decision::Allow {
                reason: self.reason,
            },
            DecisionKind::Deny => Decision::Deny {
                reason: self.reason,
            },
            DecisionKind::Ask => Decision::Ask {
                reason: self.reason,
            },
        }
    }
}

impl ReasoningLayer {
    pub fn new(evaluator: Arc<dyn LlmEvaluator>) -> Self {
        Self { evaluator }
    }
}

impl DecisionLayer for ReasoningLayer {
    fn name(&self) -> &str {
        "reasoning"
    }

    fn evaluate<'a>(
        &'a self,
        request: &'a ToolRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Decision>, DecisionError>> + Send + 'a>> {
        Box::pin(async move {
            let result = self.evaluator.evaluate(request).await?;
            tracing::info!(
                tool = %request.tool_name,
                decision = %result.decision,
                reason = %result.reason,
                "Reasoning evaluation complete"
            );
            Ok(Some(result.into_decision()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn make_request() -> ToolRequest {
        ToolRequest::new("s1", "Bash", Map::new(), "/work")
    }

    struct AskEvaluator;
    impl LlmEvaluator for AskEvaluator {
        fn evaluate<'a>(
            &'a self,
            _request: &'a ToolRequest,
        ) -> Pin<Box<dyn Future<Output = Result<LlmDecision, DecisionError>> + Send + 'a>> {
            Box::pin(async move {
                Ok(LlmDecision {
                    decision: DecisionKind::Ask,
                    reason: "needs a human".into(),
                })
            })
        }
    }

    #[tokio::test]
    async fn ask_evaluator_returns_ask() {
        let layer = ReasoningLayer::new(Arc::new(AskEvaluator));

        let result = layer.evaluate(&make_request()).await.unwrap();
        assert_eq!(result, Some(Decision::ask("needs a human")));
    }

    struct FailingEvaluator;
    impl LlmEvaluator for FailingEvaluator {
        fn evaluate<'a>(
            &'a self,
            _request: &'a ToolRequest,
        ) -> Pin<Box<dyn Future<Output = Result<LlmDecision, DecisionError>> + Send + 'a>> {
            Box::pin(async move { Err(DecisionError::Provider("API call failed".into())) })
        }
    }

    #[tokio::test]
    async fn failing_evaluator_propagates() {
        let layer = ReasoningLayer::new(Arc::new(FailingEvaluator));

        let err = layer.evaluate(&make_request()).await.unwrap_err();
        assert!(matches!(err, DecisionError::Provider(_)));
    }

    #[test]
    fn llm_decision_rejects_unknown_verdicts() {
        let raw = r#"{"decision":"maybe","reason":"unsure"}"#;
        assert!(serde_json::from_str::<LlmDecision>(raw).is_err());
    }

    #[test]
    fn llm_decision_requires_a_reason() {
        let raw = r#"{"decision":"deny"}"#;
        assert!(serde_json::from_str::<LlmDecision>(raw).is_err());
    }
}
