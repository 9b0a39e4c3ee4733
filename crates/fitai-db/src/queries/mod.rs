//! Query functions, one module per table.

pub mod plans;
pub mod preferences;
pub mod profiles;
pub mod progress;
pub mod users;
