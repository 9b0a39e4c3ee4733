//! Profile and check-in input validation.
//!
//! Inputs are checked before any generation call so a bad form never costs
//! a model request.

use serde::Deserialize;

use fitai_db::models::{DietType, Difficulty, Goal, WorkoutPlace};
use fitai_db::queries::profiles::NewProfile;

pub const AGE_RANGE: std::ops::RangeInclusive<i32> = 16..=40;
pub const HEIGHT_RANGE_CM: std::ops::RangeInclusive<f64> = 130.0..=220.0;
pub const WEIGHT_RANGE_KG: std::ops::RangeInclusive<f64> = 30.0..=200.0;
pub const BUDGET_RANGE: std::ops::RangeInclusive<i32> = 100..=1000;

/// Longest accepted free-form preferences text, in characters.
pub const MAX_PREFERENCES_LEN: usize = 300;

/// Rejected profile, check-in, or preferences input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("age {0} is outside the supported range 16-40")]
    AgeOutOfRange(i32),

    #[error("height {0} cm is outside the supported range 130-220")]
    HeightOutOfRange(f64),

    #[error("weight {0} kg is outside the supported range 30-200")]
    WeightOutOfRange(f64),

    #[error("weekly budget {0} is outside the supported range 100-1000")]
    BudgetOutOfRange(i32),

    #[error("state and city are required")]
    MissingLocation,

    #[error("preferences are {0} characters; keep them under 300")]
    PreferencesTooLong(usize),
}

/// Fitness profile fields as submitted by a user.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub age: i32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub state: String,
    pub city: String,
    pub goal: Goal,
    pub diet: DietType,
    pub workout_place: WorkoutPlace,
    pub weekly_budget: i32,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<(), ProfileError> {
        if !AGE_RANGE.contains(&self.age) {
            return Err(ProfileError::AgeOutOfRange(self.age));
        }
        if !HEIGHT_RANGE_CM.contains(&self.height_cm) {
            return Err(ProfileError::HeightOutOfRange(self.height_cm));
        }
        validate_weight(self.weight_kg)?;
        if !BUDGET_RANGE.contains(&self.weekly_budget) {
            return Err(ProfileError::BudgetOutOfRange(self.weekly_budget));
        }
        if self.state.trim().is_empty() || self.city.trim().is_empty() {
            return Err(ProfileError::MissingLocation);
        }
        Ok(())
    }

    /// Borrowed view for the store, with location fields trimmed.
    pub fn as_new_profile(&self) -> NewProfile<'_> {
        NewProfile {
            age: self.age,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            state: self.state.trim(),
            city: self.city.trim(),
            goal: self.goal,
            diet: self.diet,
            workout_place: self.workout_place,
            weekly_budget: self.weekly_budget,
        }
    }
}

/// Weekly check-in submitted before generating the next week's plan.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckIn {
    pub weight_kg: f64,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckIn {
    pub fn validate(&self) -> Result<(), ProfileError> {
        validate_weight(self.weight_kg)
    }

    /// Notes with surrounding whitespace removed; blank notes become `None`.
    pub fn trimmed_notes(&self) -> Option<&str> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

fn validate_weight(weight_kg: f64) -> Result<(), ProfileError> {
    if WEIGHT_RANGE_KG.contains(&weight_kg) {
        Ok(())
    } else {
        Err(ProfileError::WeightOutOfRange(weight_kg))
    }
}

/// Check free-form preferences text. Returns the trimmed text, or `None`
/// when it is blank.
pub fn validate_preferences(text: Option<&str>) -> Result<Option<&str>, ProfileError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let len = text.chars().count();
    if len > MAX_PREFERENCES_LEN {
        return Err(ProfileError::PreferencesTooLong(len));
    }
    Ok(Some(text))
}
