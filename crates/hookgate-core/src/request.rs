use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// A single tool-execution request as seen by the decision engine.
///
/// Built once per invocation from the parsed input envelope and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub session_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Map<String, Value>,
    pub working_directory: String,
}

impl ToolRequest {
    pub fn new(
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input: Map<String, Value>,
        working_directory: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            tool_name: tool_name.into(),
            tool_input,
            working_directory: working_directory.into(),
        }
    }

    /// Content hash of `(tool_name, tool_input)`; the working directory is not part of it.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::compute(&self.tool_name, &self.tool_input)
    }
}

/// Hex-encoded SHA-256 digest over a canonical serialization of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn compute(tool_name: &str, tool_input: &Map<String, Value>) -> Self {
        let mut canonical = String::new();
        canonical.push('[');
        write_canonical(&Value::String(tool_name.to_owned()), &mut canonical);
        canonical.push(',');
        write_canonical_object(tool_input, &mut canonical);
        canonical.push(']');

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        CacheKey(hex::encode(hasher.finalize()))
    }

    /// Wrap an already-computed digest, e.g. a key read back from disk.
    pub fn from_hex(hex: String) -> Self {
        CacheKey(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialize with object keys sorted at every depth, independent of whether
/// `serde_json` was built with insertion-ordered maps.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_object(map, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars have a single serialization.
        other => out.push_str(&other.to_string()),
    }
}

fn write_canonical_object(map: &Map<String, Value>, out: &mut String) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_canonical(&map[key], out);
    }
    out.push('}');
}
