//! Status command - registration and store summary

use crate::config::{Config, ConfigManager};
use crate::error::OffcacheResult;
use crate::store::{FsStoreProvider, StoreProvider};
use crate::ui::{self, UiContext};
use crate::worker::{Registration, WorkerRecord};

/// Execute the status command
pub async fn execute(config: &Config) -> OffcacheResult<()> {
    let ctx = UiContext::detect();
    let registration = Registration::load(ConfigManager::registration_path_for(config)).await?;
    let state = registration.snapshot().await;
    let stores = FsStoreProvider::new(ConfigManager::stores_root(config));

    ui::header(&ctx, "Offcache status");
    ui::key_value(&ctx, "Scope", &config.worker.scope);
    ui::key_value(&ctx, "Configured version", &config.worker.store_version);
    ui::key_value(&ctx, "Store root", &stores.root().display().to_string());

    println!();
    print_worker(&ctx, "Active", state.active.as_ref());
    print_worker(&ctx, "Waiting", state.waiting.as_ref());
    if let Some(installing) = &state.installing {
        ui::step_warn_hint(
            &ctx,
            &format!("Install of {} did not finish", installing.store_version),
            "Run: offcache install",
        );
    }

    println!();
    let names = stores.keys().await?;
    if names.is_empty() {
        ui::step_info(&ctx, "No stores");
    } else {
        ui::key_value(&ctx, "Stores", &names.join(", "));
    }

    match &state.active {
        Some(active) if active.store_version != config.worker.store_version => {
            ui::step_warn_hint(
                &ctx,
                "Configured version is not active",
                "Run: offcache register",
            );
        }
        None => ui::step_warn_hint(&ctx, "No active worker", "Run: offcache register"),
        Some(_) => {}
    }

    Ok(())
}

fn print_worker(ctx: &UiContext, label: &str, record: Option<&WorkerRecord>) {
    match record {
        Some(record) => ui::key_value(
            ctx,
            label,
            &format!(
                "{} ({}, {}, since {})",
                record.store_version,
                record.state,
                record.id,
                record.updated_at.format("%Y-%m-%d %H:%M")
            ),
        ),
        None => ui::key_value(ctx, label, "none"),
    }
}
