use crate::core::record::LoanRecord;
use crate::core::store::LoanStore;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory loan store backed by a Vec
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Vec<LoanRecord>>>,
}

impl MemoryStore {
    /// Creates an empty MemoryStore
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn insert(&self, record: &LoanRecord) -> Result<()> {
        let mut records = self.inner.lock().await;
        records.push(record.clone());
        debug!(count = records.len(), "MemoryStore INSERT");
        Ok(())
    }

    async fn query_all_desc(&self) -> Result<Vec<LoanRecord>> {
        let records = self.inner.lock().await;
        // Reverse first so equal timestamps stay newest-inserted first
        let mut sorted: Vec<LoanRecord> = records.iter().rev().cloned().collect();
        sorted.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        debug!(count = sorted.len(), "MemoryStore QUERY");
        Ok(sorted)
    }
}
