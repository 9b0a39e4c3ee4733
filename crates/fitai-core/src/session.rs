//! Per-user session state, passed explicitly into and out of every plan
//! service action.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the user is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub username: String,
    /// Week of the displayed plan, or 0 before the first plan exists.
    pub current_week: i32,
    pub displayed_plan: Option<String>,
}

impl SessionContext {
    /// A fresh session with no plan on screen.
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            current_week: 0,
            displayed_plan: None,
        }
    }

    /// Replace the displayed plan.
    pub fn show_plan(mut self, week: i32, body: impl Into<String>) -> Self {
        self.current_week = week;
        self.displayed_plan = Some(body.into());
        self
    }
}
