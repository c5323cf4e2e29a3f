use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::decision::Decision;
use crate::error::DecisionError;
use crate::layers::DecisionLayer;
use crate::request::ToolRequest;

/// Tools that always need a human checkpoint, whatever the cache or model says.
pub const ALWAYS_ASK_TOOLS: &[&str] = &["ExitPlanMode"];

/// Tools that only observe state.
pub const READ_ONLY_TOOLS: &[&str] = &[
    "Read",
    "LS",
    "Glob",
    "Grep",
    "WebFetch",
    "WebSearch",
    "NotebookRead",
    "TodoWrite",
    "TodoRead",
    "Task",
];

/// File mutations confined to the files the agent was asked to touch.
pub const SAFE_WRITE_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit", "NotebookEdit"];

/// Zero-I/O rule table for unambiguous tool names.
///
/// Rules are evaluated in order and the first match wins. Unknown tools fall
/// through to the cache and the reasoning layer.
#[derive(Debug, Clone)]
pub struct FastPathLayer {
    always_ask: Vec<String>,
    read_only: Vec<String>,
    safe_write: Vec<String>,
}

impl FastPathLayer {
    pub fn new(always_ask: Vec<String>, read_only: Vec<String>, safe_write: Vec<String>) -> Self {
        Self {
            always_ask,
            read_only,
            safe_write,
        }
    }

    /// The built-in tool sets.
    pub fn with_defaults() -> Self {
        Self {
            always_ask: owned(ALWAYS_ASK_TOOLS),
            read_only: owned(READ_ONLY_TOOLS),
            safe_write: owned(SAFE_WRITE_TOOLS),
        }
    }

    /// Pure and total: never touches the filesystem or the network.
    pub fn classify(&self, tool_name: &str, _tool_input: &Map<String, Value>) -> Option<Decision> {
        if self.always_ask.iter().any(|t| t == tool_name) {
            return Some(Decision::ask(format!(
                "{tool_name} requires explicit user confirmation"
            )));
        }

        if self.read_only.iter().any(|t| t == tool_name) {
            return Some(Decision::allow(format!(
                "{tool_name} is a read-only operation"
            )));
        }

        if self.safe_write.iter().any(|t| t == tool_name) {
            return Some(Decision::allow(format!(
                "{tool_name} is a safe file write operation"
            )));
        }

        None
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

impl Default for FastPathLayer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl DecisionLayer for FastPathLayer {
    fn name(&self) -> &str {
        "fast_path"
    }

    fn evaluate<'a>(
        &'a self,
        request: &'a ToolRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Decision>, DecisionError>> + Send + 'a>> {
        Box::pin(async move {
            let decision = self.classify(&request.tool_name, &request.tool_input);
            if let Some(d) = &decision {
                tracing::info!(
                    tool = %request.tool_name,
                    decision = %d.kind(),
                    "Fast path matched"
                );
            }
            Ok(decision)
        })
    }
}
