//! Hook mode: one request envelope on stdin, one decision envelope on stdout.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use hookgate_core::{
    ApprovalLogger, Decision, DecisionCache, DecisionEngine, DecisionKind, ToolRequest,
};
use hookgate_llm::{HookgateConfig, HookgatePaths, ReasoningClient};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::AsyncReadExt;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("invalid input envelope: {0}")]
    Input(String),
}

/// The envelope the host writes to stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    pub session_id: String,
    #[serde(default)]
    pub transcript_path: String,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Value,
    /// Working directory of the agent, when the host reports one.
    #[serde(default)]
    pub cwd: Option<String>,
}

impl HookInput {
    pub fn parse(raw: &str) -> Result<Self, HookError> {
        serde_json::from_str(raw).map_err(|e| HookError::Input(e.to_string()))
    }

    /// The tool input as an object. A string holding a JSON object is
    /// accepted; anything else yields `None`.
    pub fn tool_input_object(&self) -> Option<Map<String, Value>> {
        match &self.tool_input {
            Value::Object(map) => Some(map.clone()),
            Value::Null => Some(Map::new()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    pub hook_specific_output: HookSpecificOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<DecisionKind>,
    pub permission_decision_reason: String,
}

impl HookOutput {
    pub fn from_decision(decision: &Decision) -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: "PreToolUse",
                permission_decision: Some(decision.kind()),
                permission_decision_reason: decision.reason().to_string(),
            },
        }
    }

    /// No verdict; the host falls back to its own permission flow.
    pub fn no_opinion(reason: impl Into<String>) -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: "PreToolUse",
                permission_decision: None,
                permission_decision_reason: reason.into(),
            },
        }
    }
}

pub fn build_engine(config: &HookgateConfig, paths: &HookgatePaths) -> DecisionEngine {
    let mut engine = DecisionEngine::new(Arc::new(ReasoningClient::from_config(config)));
    if config.cache {
        engine = engine.with_cache(DecisionCache::new(paths.cache_file()));
    }
    if config.log {
        engine = engine.with_logger(ApprovalLogger::new(paths.log_file()));
    }
    engine
}

/// Decide a single parsed envelope.
pub async fn decide(
    input: &HookInput,
    engine: &DecisionEngine,
    working_directory: String,
) -> anyhow::Result<HookOutput> {
    let Some(tool_input) = input.tool_input_object() else {
        tracing::warn!(tool = %input.tool_name, "tool_input is not an object, no opinion");
        return Ok(HookOutput::no_opinion(
            "tool_input could not be interpreted; deferring to the host",
        ));
    };

    let request = ToolRequest::new(
        input.session_id.clone(),
        input.tool_name.clone(),
        tool_input,
        working_directory,
    );

    let result = engine.evaluate(&request).await?;
    tracing::info!(
        tool = %request.tool_name,
        layer = %result.layer,
        decision = %result.decision.kind(),
        "Decision made"
    );
    Ok(HookOutput::from_decision(&result.decision))
}

pub async fn run(paths: &HookgatePaths) -> anyhow::Result<()> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .map_err(|e| HookError::Input(format!("failed to read stdin: {e}")))?;

    let input = HookInput::parse(&raw)?;
    tracing::debug!(
        session = %input.session_id,
        transcript = %input.transcript_path,
        tool = %input.tool_name,
        "Request received"
    );
    let config = HookgateConfig::load_or_default(&paths.config_file());
    let engine = build_engine(&config, paths);

    let working_directory = match &input.cwd {
        Some(cwd) if !cwd.is_empty() => cwd.clone(),
        _ => std::env::current_dir()
            .context("failed to determine working directory")?
            .to_string_lossy()
            .into_owned(),
    };

    let output = decide(&input, &engine, working_directory).await?;
    write_output(&mut std::io::stdout().lock(), &output)
}

/// Emit the envelope as a single line. A closed stdout is an error, not a panic.
fn write_output(out: &mut impl Write, output: &HookOutput) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string(output)?).context("failed to write decision")?;
    out.flush().context("failed to write decision")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_envelope() {
        let raw = r#"{
            "session_id": "abc",
            "transcript_path": "/tmp/t.jsonl",
            "tool_name": "Read",
            "tool_input": {"file_path": "/etc/hosts"}
        }"#;
        let input = HookInput::parse(raw).unwrap();
        assert_eq!(input.session_id, "abc");
        assert_eq!(input.tool_name, "Read");
        assert_eq!(input.tool_input_object().unwrap()["file_path"], "/etc/hosts");
        assert!(input.cwd.is_none());
    }

    #[test]
    fn non_json_is_an_input_error() {
        assert!(matches!(
            HookInput::parse("not json"),
            Err(HookError::Input(_))
        ));
    }

    #[test]
    fn missing_tool_name_is_an_input_error() {
        assert!(HookInput::parse(r#"{"session_id": "abc"}"#).is_err());
    }

    #[test]
    fn stringified_tool_input_is_accepted() {
        let raw = r#"{"session_id":"s","tool_name":"Bash","tool_input":"{\"command\":\"ls\"}"}"#;
        let input = HookInput::parse(raw).unwrap();
        assert_eq!(input.tool_input_object().unwrap()["command"], "ls");
    }

    #[test]
    fn scalar_tool_input_has_no_object() {
        let raw = r#"{"session_id":"s","tool_name":"Bash","tool_input":42}"#;
        assert!(HookInput::parse(raw).unwrap().tool_input_object().is_none());
    }

    #[test]
    fn output_envelope_shape() {
        let output = HookOutput::from_decision(&Decision::deny("deletes root"));
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "hookSpecificOutput": {
                    "hookEventName": "PreToolUse",
                    "permissionDecision": "deny",
                    "permissionDecisionReason": "deletes root"
                }
            })
        );
    }

    #[test]
    fn no_opinion_omits_the_decision() {
        let json = serde_json::to_value(HookOutput::no_opinion("unsure")).unwrap();
        assert!(json["hookSpecificOutput"].get("permissionDecision").is_none());
        assert_eq!(json["hookSpecificOutput"]["permissionDecisionReason"], "unsure");
    }

    #[tokio::test]
    async fn fast_path_decides_without_credentials() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = HookgatePaths::new(tmp.path().to_path_buf());
        let engine = build_engine(&HookgateConfig::default(), &paths);
        let input = HookInput::parse(
            r#"{"session_id":"s","tool_name":"Read","tool_input":{"file_path":"/etc/hosts"}}"#,
        )
        .unwrap();

        let output = decide(&input, &engine, "/work".into()).await.unwrap();
        assert_eq!(
            output.hook_specific_output.permission_decision,
            Some(DecisionKind::Allow)
        );
        assert!(paths.log_file().exists());
    }

    #[tokio::test]
    async fn disabled_log_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = HookgatePaths::new(tmp.path().to_path_buf());
        let config = HookgateConfig {
            log: false,
            ..Default::default()
        };
        let engine = build_engine(&config, &paths);
        let input =
            HookInput::parse(r#"{"session_id":"s","tool_name":"Glob","tool_input":{}}"#).unwrap();

        decide(&input, &engine, "/work".into()).await.unwrap();
        assert!(!paths.log_file().exists());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn output_is_one_json_line() {
        let mut buf = Vec::new();
        write_output(&mut buf, &HookOutput::from_decision(&Decision::allow("ok"))).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().count(), 1);
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["hookSpecificOutput"]["permissionDecision"], "allow");
    }

    #[test]
    fn closed_stdout_is_an_error_not_a_panic() {
        let err = write_output(&mut ClosedPipe, &HookOutput::no_opinion("x")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to write decision"));
    }
}
