//! Text generation: the [`GenerationClient`] adapter trait, the Gemini
//! implementation, and the failure categories shared with the validator.

pub mod client;
pub mod gemini;

use std::fmt;

use serde::Serialize;

pub use client::GenerationClient;
pub use gemini::{GeminiClient, GeminiConfig};

// ---------------------------------------------------------------------------
// Failure categories
// ---------------------------------------------------------------------------

/// Why a generation attempt produced no usable plan text.
///
/// Each category carries a fixed user-facing message and a retry rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Quota exhausted or too many requests.
    RateLimited,
    /// The prompt was rejected as too large.
    RequestTooLarge,
    /// The API key is missing, invalid, or lacks permission.
    AccessDenied,
    /// The configured model or endpoint does not exist.
    ModelUnavailable,
    /// The service is overloaded or unreachable.
    Unavailable,
    /// Anything else.
    Failure,
}

impl FailureCategory {
    /// Message shown to the user when an action fails with this category.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::RateLimited => "AI is busy due to high usage. Please try again in a minute.",
            Self::RequestTooLarge => "Request is too large. Please try a shorter message.",
            Self::AccessDenied => "AI access issue. Please contact the administrator.",
            Self::ModelUnavailable => "AI model is temporarily unavailable. Please try later.",
            Self::Unavailable => "AI service is temporarily unavailable. Please try again later.",
            Self::Failure => "Something went wrong. Please try again.",
        }
    }

    /// Whether a second attempt with the strict prompt can help.
    ///
    /// Oversized requests and permission problems fail the same way every
    /// time, so they are terminal.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::RequestTooLarge | Self::AccessDenied)
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RateLimited => "rate_limited",
            Self::RequestTooLarge => "request_too_large",
            Self::AccessDenied => "access_denied",
            Self::ModelUnavailable => "model_unavailable",
            Self::Unavailable => "unavailable",
            Self::Failure => "failure",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failed call to the generation service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("generation service rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("generation request too large: {0}")]
    RequestTooLarge(String),

    #[error("generation service denied access (HTTP {status}): {message}")]
    AccessDenied { status: u16, message: String },

    #[error("generation model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("generation service unavailable: {0}")]
    Unavailable(String),

    #[error("generation failed: {0}")]
    Failure(String),
}

impl GenerationError {
    /// The user-facing category for this error.
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::RateLimited(_) => FailureCategory::RateLimited,
            Self::RequestTooLarge(_) => FailureCategory::RequestTooLarge,
            Self::AccessDenied { .. } => FailureCategory::AccessDenied,
            Self::ModelUnavailable(_) => FailureCategory::ModelUnavailable,
            Self::Unavailable(_) => FailureCategory::Unavailable,
            Self::Failure(_) => FailureCategory::Failure,
        }
    }
}
