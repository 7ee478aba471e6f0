//! Persistence abstraction for loan records

use super::record::LoanRecord;
use anyhow::Result;
use async_trait::async_trait;

/// A datastore that can append loan records and list them newest first.
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Appends one record.
    async fn insert(&self, record: &LoanRecord) -> Result<()>;

    /// Returns every stored record ordered by timestamp, most recent first.
    async fn query_all_desc(&self) -> Result<Vec<LoanRecord>>;
}
