use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Fitness goal selected in the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    FatLoss,
    MuscleGain,
    Maintenance,
}

impl Goal {
    /// Human-readable label used in prompts and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            Self::FatLoss => "Fat Loss",
            Self::MuscleGain => "Muscle Gain",
            Self::Maintenance => "Maintenance",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FatLoss => "fat_loss",
            Self::MuscleGain => "muscle_gain",
            Self::Maintenance => "maintenance",
        };
        f.write_str(s)
    }
}

impl FromStr for Goal {
    type Err = GoalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fat_loss" => Ok(Self::FatLoss),
            "muscle_gain" => Ok(Self::MuscleGain),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(GoalParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Goal`] string.
#[derive(Debug, Clone)]
pub struct GoalParseError(pub String);

impl fmt::Display for GoalParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid goal: {:?}", self.0)
    }
}

impl std::error::Error for GoalParseError {}

// ---------------------------------------------------------------------------

/// Dietary preference selected in the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DietType {
    Vegetarian,
    Eggetarian,
    NonVegetarian,
}

impl DietType {
    /// Human-readable label used in prompts and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Vegetarian => "Vegetarian",
            Self::Eggetarian => "Eggetarian",
            Self::NonVegetarian => "Non-Vegetarian",
        }
    }
}

impl fmt::Display for DietType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vegetarian => "vegetarian",
            Self::Eggetarian => "eggetarian",
            Self::NonVegetarian => "non_vegetarian",
        };
        f.write_str(s)
    }
}

impl FromStr for DietType {
    type Err = DietTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vegetarian" => Ok(Self::Vegetarian),
            "eggetarian" => Ok(Self::Eggetarian),
            "non_vegetarian" => Ok(Self::NonVegetarian),
            other => Err(DietTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`DietType`] string.
#[derive(Debug, Clone)]
pub struct DietTypeParseError(pub String);

impl fmt::Display for DietTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid diet type: {:?}", self.0)
    }
}

impl std::error::Error for DietTypeParseError {}

// ---------------------------------------------------------------------------

/// Where the user trains. Drives which exercises the prompt allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkoutPlace {
    Home,
    Gym,
}

impl WorkoutPlace {
    /// Human-readable label used in prompts and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Gym => "Gym",
        }
    }
}

impl fmt::Display for WorkoutPlace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Home => "home",
            Self::Gym => "gym",
        };
        f.write_str(s)
    }
}

impl FromStr for WorkoutPlace {
    type Err = WorkoutPlaceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Self::Home),
            "gym" => Ok(Self::Gym),
            other => Err(WorkoutPlaceParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`WorkoutPlace`] string.
#[derive(Debug, Clone)]
pub struct WorkoutPlaceParseError(pub String);

impl fmt::Display for WorkoutPlaceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid workout place: {:?}", self.0)
    }
}

impl std::error::Error for WorkoutPlaceParseError {}

// ---------------------------------------------------------------------------

/// How the previous week's plan felt, reported at each weekly check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    TooEasy,
    JustRight,
    TooHard,
}

impl Difficulty {
    /// Human-readable label used in prompts and CLI output.
    pub fn label(self) -> &'static str {
        match self {
            Self::TooEasy => "Too Easy",
            Self::JustRight => "Just Right",
            Self::TooHard => "Too Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TooEasy => "too_easy",
            Self::JustRight => "just_right",
            Self::TooHard => "too_hard",
        };
        f.write_str(s)
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "too_easy" => Ok(Self::TooEasy),
            "just_right" => Ok(Self::JustRight),
            "too_hard" => Ok(Self::TooHard),
            other => Err(DifficultyParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Difficulty`] string.
#[derive(Debug, Clone)]
pub struct DifficultyParseError(pub String);

impl fmt::Display for DifficultyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid difficulty: {:?}", self.0)
    }
}

impl std::error::Error for DifficultyParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A registered account. Credential columns never leave the process.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub created_at: DateTime<Utc>,
}

/// The fitness profile a plan is generated from. One row per user.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub age: i32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub state: String,
    pub city: String,
    pub goal: Goal,
    pub diet: DietType,
    pub workout_place: WorkoutPlace,
    pub weekly_budget: i32,
    pub updated_at: DateTime<Utc>,
}

/// An accepted weekly plan. Unique per `(user_id, week)`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week: i32,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A weekly check-in. At most one per `(user, week)`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week: i32,
    pub weight_kg: f64,
    pub difficulty: Difficulty,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
