//! The `GenerationClient` trait -- the adapter interface for text
//! generation services.
//!
//! The trait is object-safe so the plan service and the HTTP server can
//! hold `&dyn GenerationClient` / `Arc<dyn GenerationClient>` and tests can
//! substitute a scripted fake.

use async_trait::async_trait;

use super::GenerationError;

/// Sends a prompt to a hosted model and returns the generated text.
///
/// Implementations own transport concerns: timeouts, authentication, and
/// any backoff on rate limiting. They never inspect the returned text.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Short name used in logs (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate text for a single prompt.
    async fn query(&self, prompt: &str) -> Result<String, GenerationError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn GenerationClient) {}
};
