//! Decision engine for hookgate.
//!
//! A tool request runs through a cascade of increasingly expensive layers:
//! a zero-I/O fast path, a working-directory-scoped persistent cache, and a
//! remote reasoning model. Every final decision is appended to an audit log.

pub mod audit;
pub mod decision;
pub mod engine;
pub mod error;
pub mod layers;
pub mod request;

pub use audit::{ApprovalLogger, LogEntry};
pub use decision::{Decision, DecisionKind, DecisionLayer, LayeredDecision};
pub use engine::DecisionEngine;
pub use error::DecisionError;
pub use layers::cache::{CacheEntry, CachedVerdict, DecisionCache};
pub use layers::fast_path::FastPathLayer;
pub use layers::reasoning::{LlmDecision, LlmEvaluator};
pub use request::{CacheKey, ToolRequest};
