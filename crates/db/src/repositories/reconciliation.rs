//! Reconciliation job: recompute every wallet balance from history and
//! repair drift.
//!
//! Used for audit/repair, not normal-path correctness; the normal path
//! refreshes caches synchronously. Drift is self-healed and logged, never
//! surfaced as a hard failure. Running the job twice with no intervening
//! transactions reports zero additional drift.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::wallet::{derive_balance_on, lock_for_update_on, WalletError};
use crate::entities::wallets;

/// Error types for reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    /// Wallet-level failure while deriving or locking.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// One repaired divergence between a cached and a derived balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    /// The drifted wallet.
    pub wallet_id: Uuid,
    /// The cached value before repair.
    pub cached: Decimal,
    /// The derived value now written to the cache.
    pub derived: Decimal,
}

impl DriftReport {
    /// Signed size of the repaired drift.
    #[must_use]
    pub fn delta(&self) -> Decimal {
        self.derived - self.cached
    }
}

/// Recomputes and repairs cached wallet balances.
#[derive(Debug, Clone)]
pub struct ReconciliationJob {
    db: DatabaseConnection,
}

impl ReconciliationJob {
    /// Creates a new reconciliation job.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Reconciles every wallet in the system.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails; already-repaired
    /// wallets stay repaired.
    pub async fn run(&self) -> Result<Vec<DriftReport>, ReconciliationError> {
        let wallets = wallets::Entity::find()
            .order_by_asc(wallets::Column::Id)
            .all(&self.db)
            .await?;
        self.reconcile(wallets).await
    }

    /// Reconciles only one owner's wallets.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn run_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<DriftReport>, ReconciliationError> {
        let wallets = wallets::Entity::find()
            .filter(wallets::Column::OwnerId.eq(owner_id))
            .order_by_asc(wallets::Column::Id)
            .all(&self.db)
            .await?;
        self.reconcile(wallets).await
    }

    async fn reconcile(
        &self,
        wallets: Vec<wallets::Model>,
    ) -> Result<Vec<DriftReport>, ReconciliationError> {
        let checked = wallets.len();
        let mut reports = Vec::new();

        for wallet in wallets {
            // One short transaction per wallet: the row lock serializes
            // against in-flight propagations without blocking the whole
            // table for the duration of the job.
            let txn = self.db.begin().await?;

            let current = match lock_for_update_on(&txn, &[wallet.id]).await {
                Ok(mut locked) => locked.remove(0),
                // Deleted between listing and locking; nothing to repair.
                Err(WalletError::IdNotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            };

            let derived = derive_balance_on(&txn, current.id).await?;
            if derived != current.balance {
                let report = DriftReport {
                    wallet_id: current.id,
                    cached: current.balance,
                    derived,
                };
                tracing::warn!(
                    wallet_id = %report.wallet_id,
                    cached = %report.cached,
                    derived = %report.derived,
                    "balance drift repaired"
                );

                let mut active: wallets::ActiveModel = current.into();
                active.balance = Set(derived);
                active.updated_at = Set(chrono::Utc::now().into());
                active.update(&txn).await?;

                reports.push(report);
            }

            txn.commit().await?;
        }

        tracing::info!(checked, drifted = reports.len(), "reconciliation finished");
        Ok(reports)
    }
}
