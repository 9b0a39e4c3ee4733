//! Markdown export of a stored plan.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use fitai_db::models::Plan;

/// Render a plan body as a Markdown document.
pub fn render_markdown(week: i32, body: &str) -> String {
    format!("# Week {week} Fitness Plan\n\n{}\n", body.trim())
}

/// Default file name for an exported plan.
pub fn default_file_name(week: i32) -> String {
    format!("fitness-plan-week-{week}.md")
}

/// Write `plan` as Markdown. When `path` is a directory the default file
/// name is used inside it. Returns the path written.
pub fn write_markdown(plan: &Plan, path: &Path) -> Result<PathBuf> {
    let target = if path.is_dir() {
        path.join(default_file_name(plan.week))
    } else {
        path.to_path_buf()
    };

    std::fs::write(&target, render_markdown(plan.week, &plan.body))
        .with_context(|| format!("failed to write plan to {}", target.display()))?;

    Ok(target)
}
