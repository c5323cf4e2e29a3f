//! Append-only approval log.
//!
//! One JSON object per line in a single per-installation file. Many hook
//! processes may append at the same time, so each entry goes to disk in a
//! single `write(2)` on an `O_APPEND` descriptor and is never rewritten.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OnceCell};

use crate::decision::{Decision, DecisionKind};
use crate::error::DecisionError;
use crate::request::ToolRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub datetime: String,
    pub tool: String,
    pub inputs: Map<String, Value>,
    pub reason: String,
    pub decision: DecisionKind,
    pub cwd: String,
    pub session_id: String,
}

impl LogEntry {
    /// Build an entry stamped with the current UTC time.
    pub fn new(request: &ToolRequest, decision: &Decision) -> Self {
        Self {
            datetime: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            tool: request.tool_name.clone(),
            inputs: request.tool_input.clone(),
            reason: decision.reason().to_string(),
            decision: decision.kind(),
            cwd: request.working_directory.clone(),
            session_id: request.session_id.clone(),
        }
    }
}

/// Audit log writer. Failures are logged and dropped, never returned.
pub struct ApprovalLogger {
    path: PathBuf,
    /// One write per (session id, datetime) within this process.
    inflight: Mutex<HashMap<(String, String), Arc<OnceCell<()>>>>,
}

impl ApprovalLogger {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry. A second call for the same session and datetime waits
    /// for the first write instead of issuing its own.
    pub async fn log(&self, entry: &LogEntry) {
        let key = (entry.session_id.clone(), entry.datetime.clone());
        let cell = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(inflight.entry(key).or_default())
        };

        cell.get_or_init(|| async {
            match self.append(entry).await {
                Ok(()) => tracing::debug!(
                    path = %self.path.display(),
                    tool = %entry.tool,
                    decision = %entry.decision,
                    "Approval logged"
                ),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to write approval log, dropping entry"
                ),
            }
        })
        .await;
    }

    async fn append(&self, entry: &LogEntry) -> Result<(), DecisionError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || append_line(&path, line.as_bytes()))
            .await
            .map_err(|e| DecisionError::Log(format!("log writer task failed: {e}")))?
    }
}

fn append_line(path: &Path, bytes: &[u8]) -> Result<(), DecisionError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    // Exactly one write(2) per entry.
    let written = file.write(bytes)?;
    if written != bytes.len() {
        return Err(DecisionError::Log(format!(
            "short write: {written} of {} bytes",
            bytes.len()
        )));
    }
    Ok(())
}
