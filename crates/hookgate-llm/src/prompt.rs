use hookgate_core::LlmDecision;
use serde_json::{Map, Value};

use crate::error::LlmError;

pub const SYSTEM_PROMPT: &str = r#"You are a permission filter for an autonomous coding agent. Before each tool call runs, you decide whether it may proceed.

Decision policy:
- ALLOW by default. Building, testing, installing dependencies, editing project files, running linters, git commits, git pushes and ordinary shell usage are all allowed.
- DENY only operations that are certainly destructive or malicious: deleting the filesystem root or home directory, wiping disks or partitions, dropping production databases, exfiltrating credentials or secrets, disabling security controls, fork bombs.
- Force-pushes (git push --force, git push -f, --force-with-lease) to a protected branch (main, master, production, develop, staging) are DENIED. Force-pushes to any other branch are ALLOWED.
- ASK only when the operation is genuinely ambiguous and a human must weigh in.

Keep the reason to one short sentence."#;

const SCHEMA_INSTRUCTION: &str =
    "Respond ONLY with a JSON object matching this schema, no markdown, no text outside the JSON:";

/// The fixed two-field response schema.
pub fn decision_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "decision": {
                "type": "string",
                "enum": ["allow", "deny", "ask"],
            },
            "reason": {
                "type": "string",
            },
        },
        "required": ["decision", "reason"],
        "additionalProperties": false,
    })
}

/// System instruction for a provider. When the provider cannot enforce the
/// schema itself, the schema is spelled out in the prompt.
pub fn system_prompt(structured_output: bool) -> String {
    if structured_output {
        return SYSTEM_PROMPT.to_string();
    }

    let schema = serde_json::to_string_pretty(&decision_schema()).unwrap_or_default();
    format!("{SYSTEM_PROMPT}\n\n{SCHEMA_INSTRUCTION}\n{schema}")
}

pub fn user_prompt(tool_name: &str, tool_input: &Map<String, Value>) -> String {
    let input =
        serde_json::to_string_pretty(tool_input).unwrap_or_else(|_| format!("{tool_input:?}"));
    format!("Tool: {tool_name}\nInput:\n{input}")
}

/// Parse a model response into a decision.
///
/// Shared by every provider, whether or not the schema was enforced
/// remotely. Tolerates prose around the JSON: the first fenced code block is
/// used if there is one, otherwise the first balanced `{...}` object.
/// Anything that still does not match the schema is an error, never a
/// default verdict.
pub fn parse_decision(raw: &str) -> Result<LlmDecision, LlmError> {
    let cleaned = extract_json(raw);

    serde_json::from_str::<LlmDecision>(cleaned)
        .map_err(|e| LlmError::Parse(format!("{e}; raw response: {raw}")))
}

fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return first_object(trimmed).unwrap_or(trimmed);
    }
    fenced_block(trimmed)
        .or_else(|| first_object(trimmed))
        .unwrap_or(trimmed)
}

/// Body of the first fenced code block, minus its info string.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let rest = &text[open + 3..];
    let body_start = rest.find('\n')? + 1;
    let body = &rest[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    Some(body[..close].trim())
}

/// The first `{...}` span with balanced braces, skipping braces inside
/// string literals.
fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
