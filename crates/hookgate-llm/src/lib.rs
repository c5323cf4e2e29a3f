//! Reasoning providers for hookgate.
//!
//! Loads `config.json`, resolves exactly one provider from the configured
//! credentials, and exposes it to the decision engine as an `LlmEvaluator`.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod prompt;
pub mod provider;

pub use config::{AuthMethod, HookgateConfig, HookgatePaths};
pub use error::LlmError;
pub use evaluator::ReasoningClient;
pub use provider::ProviderConfig;
