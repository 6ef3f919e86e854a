//! AI analysis capability
//!
//! The engine only sees this trait. Implementations talk to a model
//! backend; the engine tolerates any latency or failure from them.

use async_trait::async_trait;

use crate::error::Result;

/// Produces free-text analysis of a transcript excerpt
#[async_trait]
pub trait Analyst: Send + Sync {
    /// `system_prompt` carries the role instructions, `context` the
    /// transcript. Failures should be reported as `Error::AiUnavailable`.
    async fn analyze(&self, system_prompt: &str, context: &str) -> Result<String>;
}
