//! Core loan log abstractions

pub mod config;
pub mod log;
pub mod record;
pub mod state;
pub mod store;
pub mod sync;

// Re-export main types for cleaner imports
pub use record::{AccountKind, LoanRecord};
pub use state::DashboardState;
pub use store::LoanStore;
pub use sync::{LogSynchronizer, SyncError, TriggerPhase};
