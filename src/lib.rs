pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{AccountKind, DashboardState, LogSynchronizer};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Trigger { smart: bool, count: usize },
    Logs,
    Dashboard { smart: bool },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("FlashVault starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        backend = ?config.backend,
        timeout_secs = config.request_timeout_secs,
        "Loaded config"
    );

    let store = store::open_store(&config)?;
    let state = Arc::new(DashboardState::default());
    let sync = LogSynchronizer::new(store, state).with_timeout(config.request_timeout());

    match command {
        AppCommand::Trigger { smart, count } => {
            cli::trigger::run(&sync, AccountKind::from_flag(smart), count).await
        }
        AppCommand::Logs => cli::logs::run(&sync).await,
        AppCommand::Dashboard { smart } => {
            sync.state().set_mode(AccountKind::from_flag(smart)).await;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            cli::dashboard::run(&sync, stdin).await
        }
    }
}
