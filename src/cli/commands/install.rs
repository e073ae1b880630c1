//! Install command - seed a new store version

use crate::config::Config;
use crate::error::OffcacheResult;
use crate::network::HttpNetwork;
use crate::ui::{self, UiContext};
use crate::worker::WorkerRecord;
use std::sync::Arc;

use super::WorkerEnv;

/// Execute the install command
pub async fn execute(config: &Config) -> OffcacheResult<()> {
    let ctx = UiContext::detect();
    let env = WorkerEnv::load(config).await?;

    install_worker(&ctx, &env).await?;

    if env.registration.ready_to_activate().await {
        ui::step_info(&ctx, "Ready to activate. Run: offcache activate");
    } else {
        ui::step_warn_hint(
            &ctx,
            "Waiting for the active worker",
            "Run: offcache activate --force",
        );
    }
    Ok(())
}

/// Install a new instance for the configured store version
pub(crate) async fn install_worker(ctx: &UiContext, env: &WorkerEnv) -> OffcacheResult<WorkerRecord> {
    let record = env
        .registration
        .begin_install(&env.config.worker.store_version)
        .await?;
    let controller = env.controller(&record, Arc::new(HttpNetwork::new()));

    ui::header(ctx, &format!("Installing {}", record.store_version));
    let report = env.registration.install(&record, &controller).await?;

    for url in &report.seeded {
        ui::step_ok(ctx, url);
    }
    ui::step_ok_detail(
        ctx,
        &format!("Installed {}", report.store_version),
        &format!("{} seed resources", report.seeded.len()),
    );

    Ok(record)
}
