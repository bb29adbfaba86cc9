//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application. The propagation orchestrator and reconciliation job are
//! injected with a connection the same way, so tests can point them at a
//! scratch database.

pub mod propagation;
pub mod reconciliation;
pub mod transaction;
pub mod wallet;

pub use propagation::{PropagationError, PropagationOrchestrator, TransactionSet};
pub use reconciliation::{DriftReport, ReconciliationError, ReconciliationJob};
pub use transaction::{NewEntry, TransactionError, TransactionRepository};
pub use wallet::{WalletError, WalletRepository};

use sea_orm::DbErr;

/// Heuristic for backing-store contention: lock-wait and statement timeouts
/// and deadlock aborts surface as retryable conflicts instead of opaque
/// database errors.
pub(crate) fn is_lock_conflict(err: &DbErr) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("deadlock")
        || message.contains("lock timeout")
        || message.contains("lock_timeout")
        || message.contains("could not obtain lock")
        || message.contains("statement timeout")
        || message.contains("canceling statement")
}
