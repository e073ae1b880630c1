//! Activate command - promote the waiting worker

use crate::cli::args::ActivateArgs;
use crate::config::Config;
use crate::error::OffcacheResult;
use crate::network::OfflineNetwork;
use crate::ui::{self, UiContext};
use std::sync::Arc;

use super::WorkerEnv;

/// Execute the activate command
pub async fn execute(args: ActivateArgs, config: &Config) -> OffcacheResult<()> {
    let ctx = UiContext::detect();
    let env = WorkerEnv::load(config).await?;
    activate_worker(&ctx, &env, args.force).await
}

/// Activate the waiting instance, sweeping every other store version
pub(crate) async fn activate_worker(
    ctx: &UiContext,
    env: &WorkerEnv,
    force: bool,
) -> OffcacheResult<()> {
    let record = env.registration.begin_activate(force).await?;
    // Activation only touches stores
    let controller = env.controller(&record, Arc::new(OfflineNetwork));

    ui::header(ctx, &format!("Activating {}", record.store_version));
    let report = env.registration.activate(&record, &controller).await?;

    for name in &report.deleted {
        ui::step_ok(ctx, &format!("Deleted stale store {}", name));
    }
    for name in &report.failed {
        ui::step_fail_detail(ctx, "Failed to delete stale store", name);
    }
    ui::step_ok_detail(
        ctx,
        &format!("Activated {}", report.store_version),
        &record.id.to_string(),
    );

    Ok(())
}
