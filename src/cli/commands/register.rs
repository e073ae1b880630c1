//! Register command - install and activate in one step

use crate::config::Config;
use crate::error::OffcacheResult;
use crate::ui::{self, UiContext};

use super::activate::activate_worker;
use super::install::install_worker;
use super::WorkerEnv;

/// Execute the register command
pub async fn execute(config: &Config) -> OffcacheResult<()> {
    let ctx = UiContext::detect();
    let env = WorkerEnv::load(config).await?;

    install_worker(&ctx, &env).await?;

    if !env.registration.ready_to_activate().await {
        ui::step_warn_hint(
            &ctx,
            "Installed worker is waiting",
            "Run: offcache activate --force",
        );
        return Ok(());
    }

    activate_worker(&ctx, &env, false).await
}
