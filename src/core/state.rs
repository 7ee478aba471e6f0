use super::record::{AccountKind, LoanRecord};
use tokio::sync::RwLock;
use tracing::debug;

/// Session state shown by the dashboard: the account mode toggle and the
/// most recently refreshed log.
#[derive(Debug, Default)]
pub struct DashboardState {
    mode: RwLock<AccountKind>,
    log: RwLock<Vec<LoanRecord>>,
}

impl DashboardState {
    pub fn new(mode: AccountKind) -> Self {
        Self {
            mode: RwLock::new(mode),
            log: RwLock::new(Vec::new()),
        }
    }

    pub async fn mode(&self) -> AccountKind {
        *self.mode.read().await
    }

    pub async fn set_mode(&self, mode: AccountKind) {
        *self.mode.write().await = mode;
        debug!(%mode, "Account mode set");
    }

    /// Flips the mode and returns the new value.
    pub async fn toggle_mode(&self) -> AccountKind {
        let mut mode = self.mode.write().await;
        let toggled = mode.toggled();
        *mode = toggled;
        debug!(mode = %toggled, "Account mode toggled");
        toggled
    }

    /// Snapshot of the displayed log.
    pub async fn log(&self) -> Vec<LoanRecord> {
        self.log.read().await.clone()
    }

    pub(crate) async fn replace_log(&self, records: Vec<LoanRecord>) {
        let mut log = self.log.write().await;
        debug!(old = log.len(), new = records.len(), "Replacing displayed log");
        *log = records;
    }
}
