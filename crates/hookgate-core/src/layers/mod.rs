pub mod cache;
pub mod fast_path;
pub mod reasoning;

use std::future::Future;
use std::pin::Pin;

use crate::decision::Decision;
use crate::error::DecisionError;
use crate::request::ToolRequest;

/// A single layer in the decision cascade.
///
/// Each layer examines the request and either returns a decision (short-circuiting
/// the cascade) or returns `None` to pass through to the next layer.
pub trait DecisionLayer: Send + Sync {
    /// The display name of this layer (for logging).
    fn name(&self) -> &str;

    /// Evaluate the request. Returns `Some(decision)` to short-circuit, or `None` to pass through.
    fn evaluate<'a>(
        &'a self,
        request: &'a ToolRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Decision>, DecisionError>> + Send + 'a>>;
}
