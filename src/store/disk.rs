use crate::core::record::LoanRecord;
use crate::core::store::LoanStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const PARTITION_NAME: &str = "flashloans";

/// Loan store persisted in a fjall keyspace.
///
/// Keys are the record timestamp in milliseconds followed by an insertion
/// sequence number, both big-endian, so a reverse scan lists records newest
/// first. Values hold the JSON form of the record.
pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    next_seq: AtomicU64,
}

impl DiskStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(db_path)
            .with_context(|| format!("Failed to create directory: {}", db_path.display()))?;

        let keyspace = Config::new(db_path)
            .open()
            .with_context(|| format!("Failed to open loan store at {}", db_path.display()))?;
        let partition =
            keyspace.open_partition(PARTITION_NAME, PartitionCreateOptions::default())?;
        // Records are never deleted, so the count is an unused sequence number
        let next_seq = partition.len()? as u64;
        debug!(path = %db_path.display(), records = next_seq, "Opened loan store");

        Ok(Self {
            keyspace,
            partition,
            next_seq: AtomicU64::new(next_seq),
        })
    }

    fn record_key(record: &LoanRecord, seq: u64) -> Vec<u8> {
        // Flipping the sign bit keeps pre-1970 instants ordered before later ones
        let millis = (record.timestamp().timestamp_millis() as u64) ^ (1 << 63);
        let mut key = Vec::with_capacity(16);
        key.extend_from_slice(&millis.to_be_bytes());
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }
}

#[async_trait]
impl LoanStore for DiskStore {
    async fn insert(&self, record: &LoanRecord) -> Result<()> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let key = Self::record_key(record, seq);
        self.partition.insert(key, serde_json::to_vec(record)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(seq, address = %record.user_address(), "DiskStore INSERT");
        Ok(())
    }

    async fn query_all_desc(&self) -> Result<Vec<LoanRecord>> {
        let mut records = Vec::new();
        for item in self.partition.iter().rev() {
            let (key, value) = item?;
            let record: LoanRecord = serde_json::from_slice(&value)
                .with_context(|| format!("Corrupt loan record under key {key:?}"))?;
            records.push(record);
        }
        debug!(count = records.len(), "DiskStore QUERY");
        Ok(records)
    }
}
