pub mod disk;
pub mod memory;

use crate::core::config::{AppConfig, Backend};
use crate::core::store::LoanStore;
use crate::providers::SupabaseStore;
use anyhow::{Context, Result};
use disk::DiskStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::debug;

/// Opens the loan store selected by `config.backend`.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn LoanStore>> {
    debug!(backend = ?config.backend, "Opening loan store");
    let store: Arc<dyn LoanStore> = match config.backend {
        Backend::Supabase => {
            let supabase = config
                .supabase
                .as_ref()
                .context("Backend 'supabase' requires a 'supabase' section in the config")?;
            Arc::new(SupabaseStore::new(supabase)?)
        }
        Backend::Local => Arc::new(DiskStore::open(&config.default_data_path()?)?),
        Backend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}
