//! Insert-then-refresh synchronization between the dashboard and a store

use super::record::{self, AccountKind, LoanRecord};
use super::state::DashboardState;
use super::store::LoanStore;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Store operation a [`SyncError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Query,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Operation::Insert => "Insert",
                Operation::Query => "Fetch",
            }
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SyncError {
    #[error("Insert failed: {message}")]
    Insert { message: String },
    #[error("Fetch failed: {message}")]
    Query { message: String },
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: Operation, after: Duration },
}

impl SyncError {
    pub fn operation(&self) -> Operation {
        match self {
            SyncError::Insert { .. } => Operation::Insert,
            SyncError::Query { .. } => Operation::Query,
            SyncError::Timeout { operation, .. } => *operation,
        }
    }
}

/// Steps of a single trigger, in the order they are reported.
///
/// `InsertFailed` and `RefreshFailed` are terminal. A successful run ends
/// with `RefreshOk` followed by `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPhase {
    Idle,
    Generating,
    Inserting,
    InsertFailed,
    InsertOk,
    Refreshing,
    RefreshFailed,
    RefreshOk,
}

/// Writes generated records to a [`LoanStore`] and keeps the displayed log
/// in [`DashboardState`] in step with it.
///
/// Triggers are not serialized. Two triggers awaited concurrently each run
/// their own insert and refresh, and the displayed log ends up as whichever
/// refresh response is applied last.
pub struct LogSynchronizer {
    store: Arc<dyn LoanStore>,
    state: Arc<DashboardState>,
    timeout: Duration,
}

impl LogSynchronizer {
    pub fn new(store: Arc<dyn LoanStore>, state: Arc<DashboardState>) -> Self {
        Self {
            store,
            state,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the limit applied to each store call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> &Arc<DashboardState> {
        &self.state
    }

    /// Reloads the full log from the store, newest first, and publishes it.
    ///
    /// On failure the displayed log is left as it was.
    #[instrument(name = "LogRefresh", skip(self))]
    pub async fn refresh(&self) -> Result<Vec<LoanRecord>, SyncError> {
        let records = self
            .bounded(Operation::Query, self.store.query_all_desc())
            .await
            .inspect_err(|e| warn!(error = %e, "Refresh failed, keeping displayed log"))?;

        debug!(count = records.len(), "Fetched loan log");
        self.state.replace_log(records.clone()).await;
        Ok(records)
    }

    /// Generates a record for `kind`, inserts it and refreshes the log.
    pub async fn trigger(&self, kind: AccountKind) -> Result<LoanRecord, SyncError> {
        self.trigger_with(kind, |_| {}).await
    }

    /// Same as [`trigger`](Self::trigger), reporting every phase to `observe`.
    #[instrument(name = "FlashLoanTrigger", skip(self, observe))]
    pub async fn trigger_with<F>(
        &self,
        kind: AccountKind,
        mut observe: F,
    ) -> Result<LoanRecord, SyncError>
    where
        F: FnMut(TriggerPhase),
    {
        observe(TriggerPhase::Generating);
        let record = record::generate(kind);
        debug!(?record, "Generated loan record");

        observe(TriggerPhase::Inserting);
        let inserted = self
            .bounded(Operation::Insert, self.store.insert(&record))
            .await;
        if let Err(e) = inserted {
            warn!(error = %e, "Insert failed, skipping refresh");
            observe(TriggerPhase::InsertFailed);
            return Err(e);
        }
        observe(TriggerPhase::InsertOk);
        info!(
            address = %record.user_address(),
            amount = record.amount_eth(),
            "Flash loan recorded"
        );

        // Runs only after the insert was acknowledged, so the new record is visible.
        observe(TriggerPhase::Refreshing);
        match self.refresh().await {
            Ok(_) => {
                observe(TriggerPhase::RefreshOk);
                observe(TriggerPhase::Idle);
                Ok(record)
            }
            Err(e) => {
                observe(TriggerPhase::RefreshFailed);
                Err(e)
            }
        }
    }

    async fn bounded<T, Fut>(&self, operation: Operation, call: Fut) -> Result<T, SyncError>
    where
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let message = format!("{e:#}");
                Err(match operation {
                    Operation::Insert => SyncError::Insert { message },
                    Operation::Query => SyncError::Query { message },
                })
            }
            Err(_) => Err(SyncError::Timeout {
                operation,
                after: self.timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store double that can fail or stall either operation.
    #[derive(Default)]
    struct ScriptedStore {
        inner: MemoryStore,
        insert_error: Option<String>,
        query_error: Mutex<Option<String>>,
        insert_delay: Option<Duration>,
        query_delay: Option<Duration>,
        // Per-call delays applied after the query snapshot is taken
        query_delays: Vec<Duration>,
        queries: AtomicUsize,
    }

    #[async_trait]
    impl LoanStore for ScriptedStore {
        async fn insert(&self, record: &LoanRecord) -> Result<()> {
            if let Some(delay) = self.insert_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(message) = &self.insert_error {
                return Err(anyhow!("{message}"));
            }
            self.inner.insert(record).await
        }

        async fn query_all_desc(&self) -> Result<Vec<LoanRecord>> {
            let call = self.queries.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.query_delay {
                tokio::time::sleep(delay).await;
            }
            let query_error = self.query_error.lock().unwrap().clone();
            if let Some(message) = query_error {
                return Err(anyhow!("{message}"));
            }
            let snapshot = self.inner.query_all_desc().await?;
            if let Some(delay) = self.query_delays.get(call) {
                tokio::time::sleep(*delay).await;
            }
            Ok(snapshot)
        }
    }

    fn synchronizer(store: Arc<ScriptedStore>) -> LogSynchronizer {
        LogSynchronizer::new(store, Arc::new(DashboardState::default()))
    }

    #[tokio::test]
    async fn test_refresh_empty_store() {
        let sync = synchronizer(Arc::new(ScriptedStore::default()));

        let records = sync.refresh().await.unwrap();
        assert!(records.is_empty());
        assert!(sync.state().log().await.is_empty());
    }

    #[tokio::test]
    async fn test_trigger_wallet_on_empty_store() {
        let sync = synchronizer(Arc::new(ScriptedStore::default()));

        let record = sync.trigger(AccountKind::Wallet).await.unwrap();

        let log = sync.state().log().await;
        assert_eq!(log, vec![record.clone()]);
        assert!(record.user_address().starts_with("0x"));
        assert!(!record.is_smart_account());
    }

    #[tokio::test]
    async fn test_trigger_reports_phases() {
        let sync = synchronizer(Arc::new(ScriptedStore::default()));

        let mut phases = Vec::new();
        sync.trigger_with(AccountKind::Smart, |p| phases.push(p))
            .await
            .unwrap();

        assert_eq!(
            phases,
            vec![
                TriggerPhase::Generating,
                TriggerPhase::Inserting,
                TriggerPhase::InsertOk,
                TriggerPhase::Refreshing,
                TriggerPhase::RefreshOk,
                TriggerPhase::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn test_insert_failure_keeps_log_and_skips_refresh() {
        let seeded = MemoryStore::new();
        let existing = record::generate(AccountKind::Wallet);
        seeded.insert(&existing).await.unwrap();

        let store = Arc::new(ScriptedStore {
            inner: seeded,
            insert_error: Some("null value in column \"time\"".to_string()),
            ..Default::default()
        });
        let sync = synchronizer(Arc::clone(&store));
        sync.refresh().await.unwrap();
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);

        let mut phases = Vec::new();
        let err = sync
            .trigger_with(AccountKind::Smart, |p| phases.push(p))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SyncError::Insert {
                message: "null value in column \"time\"".to_string()
            }
        );
        assert_eq!(err.to_string(), "Insert failed: null value in column \"time\"");
        assert_eq!(phases.last(), Some(&TriggerPhase::InsertFailed));
        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
        assert_eq!(sync.state().log().await, vec![existing]);
    }

    #[tokio::test]
    async fn test_query_failure_keeps_stale_log() {
        let store = Arc::new(ScriptedStore::default());
        let sync = synchronizer(Arc::clone(&store));
        let first = sync.trigger(AccountKind::Wallet).await.unwrap();

        *store.query_error.lock().unwrap() = Some("connection reset".to_string());

        let mut phases = Vec::new();
        let err = sync
            .trigger_with(AccountKind::Wallet, |p| phases.push(p))
            .await
            .unwrap_err();
        assert_eq!(err.operation(), Operation::Query);
        assert_eq!(err.to_string(), "Fetch failed: connection reset");
        assert_eq!(phases.last(), Some(&TriggerPhase::RefreshFailed));
        // The second insert went through but the view is stale
        assert_eq!(store.inner.query_all_desc().await.unwrap().len(), 2);
        assert_eq!(sync.state().log().await, vec![first]);

        assert!(sync.refresh().await.is_err());
        assert_eq!(sync.state().log().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sequential_triggers_newest_first() {
        let sync = synchronizer(Arc::new(ScriptedStore::default()));

        let first = sync.trigger(AccountKind::Wallet).await.unwrap();
        let second = sync.trigger(AccountKind::Smart).await.unwrap();

        let log = sync.refresh().await.unwrap();
        assert_eq!(log, vec![second, first]);
    }

    #[tokio::test]
    async fn test_insert_timeout() {
        let store = Arc::new(ScriptedStore {
            insert_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let sync = synchronizer(Arc::clone(&store)).with_timeout(Duration::from_millis(20));

        let err = sync.trigger(AccountKind::Wallet).await.unwrap_err();

        assert_eq!(
            err,
            SyncError::Timeout {
                operation: Operation::Insert,
                after: Duration::from_millis(20)
            }
        );
        assert_eq!(store.queries.load(Ordering::SeqCst), 0);
        assert!(sync.state().log().await.is_empty());
    }

    #[tokio::test]
    async fn test_query_timeout_keeps_displayed_log() {
        let seeded = MemoryStore::new();
        let existing = record::generate(AccountKind::Smart);
        seeded.insert(&existing).await.unwrap();

        let store = Arc::new(ScriptedStore {
            inner: seeded,
            query_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let sync = synchronizer(Arc::clone(&store)).with_timeout(Duration::from_millis(20));
        sync.state().replace_log(vec![existing.clone()]).await;

        let expected = SyncError::Timeout {
            operation: Operation::Query,
            after: Duration::from_millis(20),
        };
        assert_eq!(sync.refresh().await.unwrap_err(), expected);
        assert_eq!(sync.state().log().await, vec![existing.clone()]);

        let mut phases = Vec::new();
        let err = sync
            .trigger_with(AccountKind::Wallet, |p| phases.push(p))
            .await
            .unwrap_err();
        assert_eq!(err, expected);
        assert_eq!(phases.last(), Some(&TriggerPhase::RefreshFailed));
        assert!(phases.contains(&TriggerPhase::InsertOk));
        assert_eq!(store.inner.query_all_desc().await.unwrap().len(), 2);
        assert_eq!(sync.state().log().await, vec![existing]);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_last_refresh_wins() {
        // The first refresh is answered after the second one
        let store = Arc::new(ScriptedStore {
            query_delays: vec![Duration::from_millis(100), Duration::from_millis(10)],
            ..Default::default()
        });
        let sync = synchronizer(Arc::clone(&store));

        let (first, second) = futures::join!(
            sync.trigger(AccountKind::Wallet),
            sync.trigger(AccountKind::Smart)
        );
        let first = first.unwrap();
        second.unwrap();

        // The slow, older response overwrote the newer one
        assert_eq!(sync.state().log().await, vec![first]);

        let log = sync.refresh().await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(sync.state().log().await.len(), 2);
    }
}
