//! Core logic for FitAI: plan validation, the retry controller, the
//! generation client, prompt assembly, and the plan service that ties them
//! to the store.

pub mod account;
pub mod export;
pub mod generation;
pub mod profile;
pub mod prompt;
pub mod retry;
pub mod service;
pub mod session;
pub mod token;
pub mod validate;
