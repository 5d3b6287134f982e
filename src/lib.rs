pub mod cli;
pub mod config;
pub mod core;
pub mod settings;
pub mod sources;
pub mod strategies;

use crate::core::Currency;
use anyhow::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use crate::core::{FxError, FxResult, IntoMoney, Money};

/// Commands that need conversion factors.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Rates,
    Convert { amount: String, to: Currency },
    Allocate { amount: String, ratios: Vec<Decimal> },
    Watch,
}

fn load_config(config_path: Option<&str>) -> Result<config::AppConfig> {
    if let Some(path) = config_path {
        return config::AppConfig::load_from_path(path);
    }
    let default_path = config::AppConfig::default_config_path()?;
    if default_path.exists() {
        config::AppConfig::load()
    } else {
        warn!(
            path = %default_path.display(),
            "No configuration found, using defaults. Run `fxmoney setup` to create one"
        );
        Ok(config::AppConfig::default())
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxmoney starting...");

    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let active = Arc::new(config.build_settings().await?);
    settings::install(Arc::clone(&active));

    let result = match command {
        AppCommand::Rates => cli::rates::run(&active),
        AppCommand::Convert { amount, to } => cli::convert::run(&active, &amount, to),
        AppCommand::Allocate { amount, ratios } => cli::allocate::run(&active, &amount, &ratios),
        AppCommand::Watch => cli::watch::run(&active).await,
    };

    settings::reset();
    result
}
