//! Retry controller: one generation attempt with the primary prompt, then
//! up to [`RetryPolicy::max_fallback_attempts`] more with the strict prompt.
//!
//! Attempts are strictly sequential. Nothing here touches the store; the
//! caller persists only an accepted outcome.

use tracing::{info, warn};

use crate::generation::GenerationClient;
use crate::prompt::PromptPair;
use crate::validate::{Criteria, ValidationVerdict, evaluate};

/// How many strict-prompt regenerations a single user action may spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_fallback_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_fallback_attempts: 1,
        }
    }
}

impl RetryPolicy {
    /// Upper bound on client calls for one action.
    pub fn max_calls(&self) -> u32 {
        self.max_fallback_attempts.saturating_add(1)
    }
}

/// Result of [`generate_with_retry`].
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Text from the final attempt. `None` when the client itself failed.
    pub text: Option<String>,
    /// Verdict for the final attempt.
    pub verdict: ValidationVerdict,
    /// Number of client calls made.
    pub attempts: u32,
}

impl GenerationOutcome {
    /// The accepted plan text, if any.
    pub fn accepted_text(&self) -> Option<&str> {
        if self.verdict.is_accepted() {
            self.text.as_deref()
        } else {
            None
        }
    }
}

/// Generate text and validate it, regenerating with the strict prompt while
/// the verdict is retryable and the budget lasts.
///
/// Client failures are folded into [`ValidationVerdict::ErrorEcho`] with the
/// error's category; this function itself never fails.
pub async fn generate_with_retry(
    client: &dyn GenerationClient,
    policy: &RetryPolicy,
    prompts: &PromptPair,
    criteria: &Criteria<'_>,
) -> GenerationOutcome {
    let mut prompt = prompts.primary.as_str();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let (text, verdict) = match client.query(prompt).await {
            Ok(text) => {
                let verdict = evaluate(&text, criteria);
                (Some(text), verdict)
            }
            Err(e) => {
                warn!(client = client.name(), attempt = attempts, error = %e, "generation call failed");
                (
                    None,
                    ValidationVerdict::ErrorEcho {
                        category: e.category(),
                    },
                )
            }
        };

        if verdict.is_accepted() || !verdict.is_retryable() || attempts >= policy.max_calls() {
            if !verdict.is_accepted() {
                info!(attempt = attempts, ?verdict, "generation rejected");
            }
            return GenerationOutcome {
                text,
                verdict,
                attempts,
            };
        }

        info!(attempt = attempts, ?verdict, "regenerating with strict prompt");
        prompt = prompts.strict.as_str();
    }
}
