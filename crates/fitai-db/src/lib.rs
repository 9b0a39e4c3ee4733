//! Persistence layer for FitAI: connection pool, embedded migrations,
//! row models, and query functions for users, profiles, plans, progress,
//! and preferences.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
