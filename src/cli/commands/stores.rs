//! Stores command - inspect and remove persisted stores

use crate::cli::args::{OutputFormat, StoresAction, StoresArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{OffcacheError, OffcacheResult};
use crate::store::{EntryInfo, FsStoreProvider, StoreProvider};
use crate::ui::{self, UiContext};
use crate::worker::Registration;
use console::style;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StoreSummary {
    name: String,
    entries: usize,
    active: bool,
}

/// Execute the stores command
pub async fn execute(args: StoresArgs, config: &Config) -> OffcacheResult<()> {
    let stores = FsStoreProvider::new(ConfigManager::stores_root(config));

    match args.action {
        StoresAction::List { format } => list(&stores, config, format).await,
        StoresAction::Show { name, format } => show(&stores, &name, format).await,
        StoresAction::Delete { name } => delete(&stores, &name).await,
        StoresAction::Clear { yes } => clear(&stores, yes).await,
    }
}

async fn list(stores: &FsStoreProvider, config: &Config, format: OutputFormat) -> OffcacheResult<()> {
    let registration = Registration::load(ConfigManager::registration_path_for(config)).await?;
    let active = registration.active().await.map(|r| r.store_version);

    let mut summaries = Vec::new();
    for name in stores.keys().await? {
        let entries = stores.open(&name).await?.keys().await?.len();
        summaries.push(StoreSummary {
            active: active.as_deref() == Some(name.as_str()),
            name,
            entries,
        });
    }

    if summaries.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&UiContext::detect(), "No stores"),
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => {
            println!(
                "{:<32} {:<8} {:<8}",
                style("NAME").bold(),
                style("ENTRIES").bold(),
                style("ACTIVE").bold()
            );
            println!("{}", "-".repeat(50));
            for summary in &summaries {
                let active = if summary.active {
                    style("yes").green()
                } else {
                    style("no").dim()
                };
                println!("{:<32} {:<8} {:<8}", summary.name, summary.entries, active);
            }
            println!();
            println!("{} store(s)", summaries.len());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Plain => {
            for summary in &summaries {
                println!("{}", summary.name);
            }
        }
    }

    Ok(())
}

async fn show(stores: &FsStoreProvider, name: &str, format: OutputFormat) -> OffcacheResult<()> {
    if !stores.has(name).await? {
        return Err(OffcacheError::StoreNotFound(name.to_string()));
    }
    let entries = stores.open(name).await?.keys().await?;

    match format {
        OutputFormat::Table => print_entries(name, &entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.url);
            }
        }
    }
    Ok(())
}

fn print_entries(name: &str, entries: &[EntryInfo]) {
    ui::header(&UiContext::detect(), name);

    println!(
        "{:<7} {:<6} {:<10} {:<17} {}",
        style("METHOD").bold(),
        style("STATUS").bold(),
        style("SIZE").bold(),
        style("STORED").bold(),
        style("URL").bold()
    );
    for entry in entries {
        let status = if (200..300).contains(&entry.status) {
            style(entry.status.to_string()).green()
        } else {
            style(entry.status.to_string()).yellow()
        };
        println!(
            "{:<7} {:<6} {:<10} {:<17} {}",
            entry.method.as_str(),
            status,
            entry.body_len,
            entry.stored_at.format("%Y-%m-%d %H:%M").to_string(),
            entry.url
        );
    }
    println!();
    println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

async fn delete(stores: &FsStoreProvider, name: &str) -> OffcacheResult<()> {
    if !stores.delete(name).await? {
        return Err(OffcacheError::StoreNotFound(name.to_string()));
    }
    ui::step_ok(&UiContext::detect(), &format!("Deleted store {}", name));
    Ok(())
}

async fn clear(stores: &FsStoreProvider, yes: bool) -> OffcacheResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let names = stores.keys().await?;

    if names.is_empty() {
        ui::step_info(&ctx, "No stores to delete");
        return Ok(());
    }

    let prompt = format!("Delete {} store(s)?", names.len());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Nothing deleted", "Use --yes to skip confirmation");
        return Ok(());
    }

    for name in &names {
        match stores.delete(name).await {
            Ok(_) => ui::step_ok(&ctx, &format!("Deleted store {}", name)),
            Err(e) => ui::step_fail_detail(&ctx, &format!("Failed to delete {}", name), &e.to_string()),
        }
    }
    Ok(())
}
