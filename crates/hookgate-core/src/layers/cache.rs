use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decision::Decision;
use crate::error::DecisionError;
use crate::layers::DecisionLayer;
use crate::request::{CacheKey, ToolRequest};

/// Suffix appended to the reason of a decision served from the cache.
pub const CACHED_SUFFIX: &str = " (cached)";

/// The only verdicts the cache can hold. There is no `Ask` variant, so an
/// ambiguous outcome cannot be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachedVerdict {
    Allow,
    Deny,
}

impl CachedVerdict {
    pub fn from_decision(decision: &Decision) -> Option<Self> {
        match decision {
            Decision::Allow { .. } => Some(CachedVerdict::Allow),
            Decision::Deny { .. } => Some(CachedVerdict::Deny),
            Decision::Ask { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub tool_name: String,
    pub tool_input: Map<String, Value>,
    pub decision: CachedVerdict,
    pub reason: String,
    /// RFC 3339 / ISO-8601, UTC.
    pub timestamp: String,
}

impl CacheEntry {
    pub fn to_decision(&self) -> Decision {
        match self.decision {
            CachedVerdict::Allow => Decision::allow(self.reason.clone()),
            CachedVerdict::Deny => Decision::deny(self.reason.clone()),
        }
    }
}

/// Working directory -> request hash -> entry.
pub type CacheStore = BTreeMap<String, BTreeMap<CacheKey, CacheEntry>>;

/// On-disk schema generations of the cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Decisions labelled `approve` / `block`.
    V1,
    /// Decisions labelled `allow` / `deny`.
    V2,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion::V2;
}

/// Outcome of running the migration chain over a raw document.
#[derive(Debug)]
pub struct Migration {
    pub from: SchemaVersion,
    pub store: CacheStore,
    pub kept: usize,
    pub dropped: usize,
}

/// Map a legacy decision label onto the current vocabulary.
fn migrate_label(label: &str) -> Option<&'static str> {
    match label {
        "approve" | "allow" => Some("allow"),
        "block" | "deny" => Some("deny"),
        _ => None,
    }
}

/// Migrate a V1 document to V2. Every entry is re-validated against the
/// current schema and dropped if it still does not fit.
pub fn migrate_v1_to_v2(raw: &Value) -> Migration {
    let mut store = CacheStore::new();
    let mut kept = 0;
    let mut dropped = 0;

    let Some(dirs) = raw.as_object() else {
        return Migration {
            from: SchemaVersion::V1,
            store,
            kept,
            dropped,
        };
    };

    for (cwd, entries) in dirs {
        let Some(entries) = entries.as_object() else {
            dropped += 1;
            continue;
        };

        let mut migrated = BTreeMap::new();
        for (key, entry) in entries {
            let mut entry = entry.clone();
            if let Some(label) = entry.get("decision").and_then(Value::as_str) {
                match migrate_label(label) {
                    Some(current) => entry["decision"] = Value::String(current.into()),
                    None => {
                        dropped += 1;
                        continue;
                    }
                }
            }

            match serde_json::from_value::<CacheEntry>(entry) {
                Ok(valid) => {
                    migrated.insert(CacheKey::from_hex(key.clone()), valid);
                    kept += 1;
                }
                Err(_) => dropped += 1,
            }
        }

        if !migrated.is_empty() {
            store.insert(cwd.clone(), migrated);
        }
    }

    Migration {
        from: SchemaVersion::V1,
        store,
        kept,
        dropped,
    }
}

/// Persistent, working-directory-scoped store of prior verdicts.
///
/// The whole file is read on every lookup and rewritten on every mutation.
/// There is no cross-process locking: concurrent writers race and the last
/// rename wins, which only costs a future reasoning call.
#[derive(Debug, Clone)]
pub struct DecisionCache {
    path: PathBuf,
}

impl DecisionCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the entry for this exact working directory and request hash.
    pub async fn get(
        &self,
        tool_name: &str,
        tool_input: &Map<String, Value>,
        working_directory: &str,
    ) -> Option<CacheEntry> {
        let key = CacheKey::compute(tool_name, tool_input);
        let mut store = self.load().await;
        store
            .get_mut(working_directory)
            .and_then(|entries| entries.remove(&key))
    }

    /// Record a terminal verdict and rewrite the whole store.
    pub async fn put(
        &self,
        tool_name: &str,
        tool_input: &Map<String, Value>,
        working_directory: &str,
        decision: CachedVerdict,
        reason: &str,
    ) -> Result<(), DecisionError> {
        let key = CacheKey::compute(tool_name, tool_input);
        let mut store = self.load().await;

        store.entry(working_directory.to_string()).or_default().insert(
            key,
            CacheEntry {
                tool_name: tool_name.to_string(),
                tool_input: tool_input.clone(),
                decision,
                reason: reason.to_string(),
                timestamp: chrono::Utc::now()
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            },
        );

        self.persist(&store).await
    }

    /// Overwrite the store with an empty document.
    pub async fn clear(&self) -> Result<(), DecisionError> {
        self.persist(&CacheStore::new()).await?;
        tracing::info!(path = %self.path.display(), "Decision cache cleared");
        Ok(())
    }

    /// Read the store. Absent or corrupt files read as empty; documents in a
    /// prior schema are migrated and written back.
    pub async fn load(&self) -> CacheStore {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheStore::new(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Cache unreadable, treating as empty"
                );
                return CacheStore::new();
            }
        };

        let raw: Value = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Cache corrupt, treating as empty"
                );
                return CacheStore::new();
            }
        };

        let raw = match serde_json::from_value::<CacheStore>(raw.clone()) {
            Ok(store) => return store,
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    "Cache does not match {:?} schema",
                    SchemaVersion::CURRENT
                );
                raw
            }
        };

        let migration = migrate_v1_to_v2(&raw);
        tracing::info!(
            from = ?migration.from,
            kept = migration.kept,
            dropped = migration.dropped,
            "Cache migrated"
        );

        if let Err(e) = self.persist(&migration.store).await {
            tracing::warn!(error = %e, "Failed to persist migrated cache");
        }
        migration.store
    }

    async fn persist(&self, store: &CacheStore) -> Result<(), DecisionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(store)?;

        // Rewrite through a sibling file so readers never see a half-written store.
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(DecisionError::Cache(format!(
                "failed to replace {}: {e}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl DecisionLayer for DecisionCache {
    fn name(&self) -> &str {
        "cache"
    }

    fn evaluate<'a>(
        &'a self,
        request: &'a ToolRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Decision>, DecisionError>> + Send + 'a>> {
        Box::pin(async move {
            let Some(entry) = self
                .get(
                    &request.tool_name,
                    &request.tool_input,
                    &request.working_directory,
                )
                .await
            else {
                return Ok(None);
            };

            tracing::info!(
                tool = %request.tool_name,
                cwd = %request.working_directory,
                decision = ?entry.decision,
                "Cache hit"
            );

            let decision = entry.to_decision();
            let reason = format!("{}{CACHED_SUFFIX}", decision.reason());
            Ok(Some(decision.with_reason(reason)))
        })
    }
}
