//! Confirmation prompts

use super::context::UiContext;
use crate::error::{OffcacheError, OffcacheResult};

/// Ask a yes/no question.
///
/// Auto-yes approves without asking; a non-interactive run answers `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> OffcacheResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .map_err(|e| OffcacheError::User(format!("Prompt task failed: {}", e)))?;

    answer.map_err(|e| OffcacheError::User(format!("Prompt failed: {}", e)))
}
