use serde::{Deserialize, Serialize};

/// Tri-state verdict returned to the host, each carrying a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    /// The tool call may proceed.
    Allow { reason: String },
    /// The tool call is refused.
    Deny { reason: String },
    /// The host should pause and ask the user.
    Ask { reason: String },
}

impl Decision {
    pub fn allow(reason: impl Into<String>) -> Self {
        Decision::Allow {
            reason: reason.into(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny {
            reason: reason.into(),
        }
    }

    pub fn ask(reason: impl Into<String>) -> Self {
        Decision::Ask {
            reason: reason.into(),
        }
    }

    /// Allow and Deny are terminal and may be cached; Ask never is.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Decision::Allow { .. } | Decision::Deny { .. })
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Allow { .. } => DecisionKind::Allow,
            Decision::Deny { .. } => DecisionKind::Deny,
            Decision::Ask { .. } => DecisionKind::Ask,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Decision::Allow { reason } | Decision::Deny { reason } | Decision::Ask { reason } => {
                reason
            }
        }
    }

    pub fn with_reason(&self, reason: String) -> Self {
        match self {
            Decision::Allow { .. } => Decision::Allow { reason },
            Decision::Deny { .. } => Decision::Deny { reason },
            Decision::Ask { .. } => Decision::Ask { reason },
        }
    }
}

/// The bare verdict label, as it appears on the wire and in the approval log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Allow,
    Deny,
    Ask,
}

impl DecisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionKind::Allow => "allow",
            DecisionKind::Deny => "deny",
            DecisionKind::Ask => "ask",
        }
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which layer of the cascade produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionLayer {
    FastPath,
    Cache,
    Reasoning,
}

impl std::fmt::Display for DecisionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionLayer::FastPath => write!(f, "fast_path"),
            DecisionLayer::Cache => write!(f, "cache"),
            DecisionLayer::Reasoning => write!(f, "reasoning"),
        }
    }
}

/// A decision paired with the layer that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayeredDecision {
    pub decision: Decision,
    pub layer: DecisionLayer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_allow_and_deny_are_terminal() {
        assert!(Decision::allow("ok").is_terminal());
        assert!(Decision::deny("no").is_terminal());
        assert!(!Decision::ask("hmm").is_terminal());
    }

    #[test]
    fn with_reason_keeps_the_verdict() {
        let d = Decision::deny("rm -rf").with_reason("rm -rf (cached)".into());
        assert_eq!(d.kind(), DecisionKind::Deny);
        assert_eq!(d.reason(), "rm -rf (cached)");
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DecisionKind::Ask).unwrap(),
            "\"ask\""
        );
    }
}
