//! Plan validator: decides whether generated text is a complete weekly plan.
//!
//! [`evaluate`] is pure. It never touches the store and never fails; every
//! outcome is a [`ValidationVerdict`].

use serde::Serialize;

use crate::generation::FailureCategory;

/// Days every plan must cover, in order.
pub const REQUIRED_DAYS: [u8; 7] = [1, 2, 3, 4, 5, 6, 7];

/// Minimum length, in characters, of a freshly generated initial plan.
pub const INITIAL_MIN_LENGTH: usize = 800;

/// An updated plan shorter than this fraction of its predecessor is treated
/// as a truncated regression.
pub const MIN_LENGTH_RATIO: f64 = 0.7;

/// Phrases that mark the text as an error message rather than a plan.
/// Matched against the lowercased text.
pub const MARKER_PHRASES: &[&str] = &[
    "ai is busy",
    "high usage",
    "try again",
    "please try again",
    "currently unavailable",
    "service unavailable",
    "rate limit",
    "too many requests",
    "unable to generate",
    "something went wrong",
    "error",
];

const WARNING_GLYPH: char = '\u{26A0}';

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Structural requirements a candidate is checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct Criteria<'a> {
    /// The plan being replaced, for update and modification flows.
    pub previous_text: Option<&'a str>,
    /// Minimum character count, for initial generation.
    pub min_absolute_length: Option<usize>,
}

impl<'a> Criteria<'a> {
    /// Initial generation: enforce [`INITIAL_MIN_LENGTH`].
    pub fn initial() -> Self {
        Self {
            previous_text: None,
            min_absolute_length: Some(INITIAL_MIN_LENGTH),
        }
    }

    /// Modification of an existing plan: enforce the length-ratio guard.
    pub fn replacing(previous: &'a str) -> Self {
        Self {
            previous_text: Some(previous),
            min_absolute_length: None,
        }
    }

    /// Anchors and marker phrases only.
    pub fn anchors_only() -> Self {
        Self::default()
    }
}

/// Result of checking one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationVerdict {
    /// The text is a complete plan.
    Accepted,
    /// Day anchors are missing, or the text is too short to be complete.
    /// `missing_days` is empty when only the length check failed.
    Incomplete { missing_days: Vec<u8> },
    /// The replacement is much shorter than the plan it would overwrite.
    TooShort {
        actual_length: usize,
        previous_length: usize,
    },
    /// The text is an error message, or the client reported a failure.
    ErrorEcho { category: FailureCategory },
}

impl ValidationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Whether a strict-prompt regeneration may fix this verdict.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Incomplete { .. } => true,
            Self::ErrorEcho { category } => category.is_retryable(),
            Self::Accepted | Self::TooShort { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Check generated text against `criteria`.
///
/// Checks run in a fixed order: empty text, marker phrases, day anchors,
/// absolute length, then the length ratio against the previous plan.
pub fn evaluate(text: &str, criteria: &Criteria<'_>) -> ValidationVerdict {
    if text.trim().is_empty() {
        return ValidationVerdict::Incomplete {
            missing_days: REQUIRED_DAYS.to_vec(),
        };
    }

    let lowered = text.to_lowercase();

    if let Some(category) = detect_error_echo(text, &lowered) {
        return ValidationVerdict::ErrorEcho { category };
    }

    let missing_days = missing_days(&lowered);
    if !missing_days.is_empty() {
        return ValidationVerdict::Incomplete { missing_days };
    }

    let length = text.chars().count();

    if criteria.min_absolute_length.is_some_and(|min| length < min) {
        return ValidationVerdict::Incomplete {
            missing_days: Vec::new(),
        };
    }

    if let Some(previous) = criteria.previous_text {
        let previous_length = previous.chars().count();
        if (length as f64) < previous_length as f64 * MIN_LENGTH_RATIO {
            return ValidationVerdict::TooShort {
                actual_length: length,
                previous_length,
            };
        }
    }

    ValidationVerdict::Accepted
}

/// Days whose `Day N:` anchor is absent from already-lowercased text.
fn missing_days(lowered: &str) -> Vec<u8> {
    REQUIRED_DAYS
        .iter()
        .copied()
        .filter(|day| !lowered.contains(&format!("day {day}:")))
        .collect()
}

/// Return the failure category if the text looks like an error message.
fn detect_error_echo(text: &str, lowered: &str) -> Option<FailureCategory> {
    let glyph = text.trim_start().starts_with(WARNING_GLYPH);
    let phrase = MARKER_PHRASES.iter().any(|p| lowered.contains(p));
    if glyph || phrase {
        Some(classify_echo(lowered))
    } else {
        None
    }
}

/// Map an echoed error message onto the closest failure category.
fn classify_echo(lowered: &str) -> FailureCategory {
    const RULES: &[(&[&str], FailureCategory)] = &[
        (
            &["ai is busy", "high usage", "rate limit", "too many requests", "quota"],
            FailureCategory::RateLimited,
        ),
        (&["too large", "too long"], FailureCategory::RequestTooLarge),
        (
            &["access issue", "permission", "administrator"],
            FailureCategory::AccessDenied,
        ),
        (&["model is temporarily unavailable"], FailureCategory::ModelUnavailable),
        (
            &["unavailable", "overloaded"],
            FailureCategory::Unavailable,
        ),
    ];

    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, category)| *category)
        .unwrap_or(FailureCategory::Failure)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A complete seven-day plan padded to at least `min_len` characters.
    pub(crate) fn complete_plan(min_len: usize) -> String {
        let mut text = String::from("Week Fitness Plan\n");
        for day in REQUIRED_DAYS {
            text.push_str(&format!("Day {day}:\n- Squats: 3 x 12\n- Poha with peanuts\n"));
        }
        while text.chars().count() < min_len {
            text.push_str("- Drink 2.5 to 3 liters of water daily\n");
        }
        text
    }

    #[test]
    fn complete_plan_is_accepted() {
        let text = complete_plan(900);
        assert!(text.chars().count() >= 900);
        assert_eq!(evaluate(&text, &Criteria::initial()), ValidationVerdict::Accepted);
    }

    #[test]
    fn empty_text_is_missing_every_day() {
        for text in ["", "   \n\t"] {
            assert_eq!(
                evaluate(text, &Criteria::initial()),
                ValidationVerdict::Incomplete {
                    missing_days: vec![1, 2, 3, 4, 5, 6, 7]
                }
            );
        }
    }

    #[test]
    fn busy_message_is_error_echo() {
        let text = "\u{26A0}\u{FE0F} AI is busy due to high usage. Please try again in a minute.";
        assert_eq!(
            evaluate(text, &Criteria::initial()),
            ValidationVerdict::ErrorEcho {
                category: FailureCategory::RateLimited
            }
        );
    }

    #[test]
    fn marker_phrase_wins_over_complete_anchors() {
        let mut text = complete_plan(900);
        text.push_str("Something went wrong while generating.");
        assert_eq!(
            evaluate(&text, &Criteria::anchors_only()),
            ValidationVerdict::ErrorEcho {
                category: FailureCategory::Failure
            }
        );
    }

    #[test]
    fn marker_match_is_case_insensitive() {
        let verdict = evaluate("SERVICE UNAVAILABLE", &Criteria::anchors_only());
        assert_eq!(
            verdict,
            ValidationVerdict::ErrorEcho {
                category: FailureCategory::Unavailable
            }
        );
    }

    #[test]
    fn leading_glyph_alone_is_error_echo() {
        let verdict = evaluate(
            "\u{26A0}\u{FE0F} Request is too large. Please try a shorter message.",
            &Criteria::anchors_only(),
        );
        assert_eq!(
            verdict,
            ValidationVerdict::ErrorEcho {
                category: FailureCategory::RequestTooLarge
            }
        );
        assert!(!verdict.is_retryable());
    }

    #[test]
    fn echo_classification_covers_user_messages() {
        let cases = [
            ("AI access issue. Please contact the administrator.", FailureCategory::AccessDenied),
            (
                "AI model is temporarily unavailable. Please try later.",
                FailureCategory::ModelUnavailable,
            ),
            (
                "AI servers are overloaded right now. Please try again shortly.",
                FailureCategory::Unavailable,
            ),
            ("Too many requests", FailureCategory::RateLimited),
            ("Unable to generate a plan", FailureCategory::Failure),
        ];
        for (text, expected) in cases {
            assert_eq!(classify_echo(&text.to_lowercase()), expected, "{text}");
        }
    }

    #[test]
    fn missing_days_are_reported() {
        let text = "Day 1: a\nDay 2: b\nday 3: c\nDAY 5: e\nDay 6: f\n";
        assert_eq!(
            evaluate(text, &Criteria::anchors_only()),
            ValidationVerdict::Incomplete {
                missing_days: vec![4, 7]
            }
        );
    }

    #[test]
    fn anchor_requires_colon() {
        let text = (1..=7).map(|d| format!("Day {d} - rest\n")).collect::<String>();
        let verdict = evaluate(&text, &Criteria::anchors_only());
        assert_eq!(
            verdict,
            ValidationVerdict::Incomplete {
                missing_days: REQUIRED_DAYS.to_vec()
            }
        );
    }

    #[test]
    fn short_initial_plan_is_incomplete_without_missing_days() {
        let text = complete_plan(0);
        assert!(text.chars().count() < INITIAL_MIN_LENGTH);
        let verdict = evaluate(&text, &Criteria::initial());
        assert_eq!(
            verdict,
            ValidationVerdict::Incomplete {
                missing_days: vec![]
            }
        );
        assert!(verdict.is_retryable());
    }

    #[test]
    fn shrunken_update_is_too_short() {
        let previous = "x".repeat(1000);
        let updated = complete_plan(650);
        let updated: String = updated.chars().take(650).collect();
        assert!(missing_days(&updated.to_lowercase()).is_empty());

        let verdict = evaluate(&updated, &Criteria::replacing(&previous));
        assert_eq!(
            verdict,
            ValidationVerdict::TooShort {
                actual_length: 650,
                previous_length: 1000
            }
        );
        assert!(!verdict.is_retryable());
    }

    #[test]
    fn update_at_exact_ratio_is_accepted() {
        let previous = "x".repeat(1000);
        let updated: String = complete_plan(700).chars().take(700).collect();
        assert_eq!(
            evaluate(&updated, &Criteria::replacing(&previous)),
            ValidationVerdict::Accepted
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let previous = "x".repeat(1000);
        // Multi-byte characters pad the byte length but not the char count.
        let mut updated: String = complete_plan(0);
        while updated.chars().count() < 690 {
            updated.push('\u{20B9}');
        }
        assert!(updated.len() > 700);
        assert!(matches!(
            evaluate(&updated, &Criteria::replacing(&previous)),
            ValidationVerdict::TooShort { .. }
        ));
    }

    #[test]
    fn evaluate_is_idempotent() {
        let text = complete_plan(820);
        let criteria = Criteria::initial();
        assert_eq!(evaluate(&text, &criteria), evaluate(&text, &criteria));
    }

    #[test]
    fn verdict_serializes_with_tag() {
        let json = serde_json::to_value(ValidationVerdict::Incomplete {
            missing_days: vec![7],
        })
        .unwrap();
        assert_eq!(json["verdict"], "incomplete");
        assert_eq!(json["missing_days"][0], 7);
    }
}
