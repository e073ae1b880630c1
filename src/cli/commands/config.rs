//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{OffcacheError, OffcacheResult};
use crate::message::resolve_url;
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: [&str; 7] = [
    "general.log_format",
    "general.journal",
    "worker.scope",
    "worker.store_version",
    "worker.seed_resources",
    "storage.root",
    "fallback.body",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> OffcacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let mut config = config.clone();
            set_value(&mut config, &key, &value)?;
            manager.save(&config).await?;
            ui::step_ok(&UiContext::detect(), &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> OffcacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> OffcacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// Apply a dot-separated key to `config`, validating the value
fn set_value(config: &mut Config, key: &str, value: &str) -> OffcacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(OffcacheError::User(format!(
                    "Invalid log format: {}. Use text/json",
                    value
                )))
            }
        },
        ["general", "journal"] => config.general.journal = parse_bool(value)?,

        ["worker", "scope"] => {
            // Rejects anything that is not an absolute http(s) URL
            resolve_url(value, "/")?;
            config.worker.scope = value.to_string();
        }
        ["worker", "store_version"] => {
            if value.trim().is_empty() {
                return Err(OffcacheError::User("Store version cannot be empty".to_string()));
            }
            config.worker.store_version = value.to_string();
        }
        ["worker", "seed_resources"] => {
            config.worker.seed_resources = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        ["storage", "root"] => {
            config.storage.root = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }

        ["fallback", "body"] => config.fallback.body = value.to_string(),

        _ => {
            return Err(OffcacheError::User(format!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }

    Ok(())
}

fn parse_bool(value: &str) -> OffcacheResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(OffcacheError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}
