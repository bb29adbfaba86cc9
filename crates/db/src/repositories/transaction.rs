//! Ledger log: append-only transaction entries and narrow status updates.
//!
//! Entries are the only source of truth for money. They are inserted once
//! and never mutated afterwards, except for the explicit status transitions
//! below; there is no generic field-merge update.

use centime_core::ledger::{EntryType, TransactionStatus};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::wallet::{refresh_cached_balance_on, WalletError};
use crate::entities::{
    sea_orm_active_enums::{self, counted_statuses},
    transactions,
};

/// Error types for ledger log operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    NotFound(Uuid),

    /// Entry amount cannot be zero.
    #[error("Entry amount cannot be zero")]
    ZeroAmount,

    /// The entry is already in a terminal status and cannot transition.
    #[error("Transaction {id} is already {status} and cannot transition")]
    TerminalStatus {
        /// The entry id.
        id: Uuid,
        /// Its current terminal status.
        status: TransactionStatus,
    },

    /// Wallet error during the post-append cache refresh.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for appending one ledger entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    /// The wallet the entry posts to.
    pub wallet_id: Uuid,
    /// Signed amount: credits positive, debits negative.
    pub amount: Decimal,
    /// Entry classification.
    pub entry_type: EntryType,
    /// Settlement status; `None` only for imported legacy rows.
    pub status: Option<TransactionStatus>,
    /// Free-text description.
    pub description: String,
    /// Order correlation id, if the entry belongs to an order.
    pub order_id: Option<Uuid>,
    /// Plan correlation id, if the entry belongs to a plan purchase.
    pub plan_id: Option<Uuid>,
    /// Logical parent for mirrored/derived entries.
    pub related_transaction_id: Option<Uuid>,
}

impl NewEntry {
    /// A plain entry with no correlation fields.
    #[must_use]
    pub fn plain(
        wallet_id: Uuid,
        amount: Decimal,
        entry_type: EntryType,
        status: TransactionStatus,
        description: impl Into<String>,
    ) -> Self {
        Self {
            wallet_id,
            amount,
            entry_type,
            status: Some(status),
            description: description.into(),
            order_id: None,
            plan_id: None,
            related_transaction_id: None,
        }
    }
}

/// Ledger log repository.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends one entry and refreshes the wallet's cached balance, both
    /// inside one database transaction.
    ///
    /// A caller reading the wallet immediately after this returns observes
    /// the updated balance.
    ///
    /// # Errors
    ///
    /// Returns `ZeroAmount` for a zero entry or a database error.
    pub async fn append(&self, entry: NewEntry) -> Result<transactions::Model, TransactionError> {
        let txn = self.db.begin().await?;
        let inserted = append_on(&txn, entry).await?;
        refresh_cached_balance_on(&txn, inserted.wallet_id).await?;
        txn.commit().await?;
        Ok(inserted)
    }

    /// Finds an entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<transactions::Model>, TransactionError> {
        let entry = transactions::Entity::find_by_id(id).one(&self.db).await?;
        Ok(entry)
    }

    /// Lists a wallet's entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_wallet(
        &self,
        wallet_id: Uuid,
    ) -> Result<Vec<transactions::Model>, TransactionError> {
        let entries = transactions::Entity::find()
            .filter(transactions::Column::WalletId.eq(wallet_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(entries)
    }

    /// Finds all entries correlated to an order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<transactions::Model>, TransactionError> {
        find_by_order_on(&self.db, order_id).await
    }

    /// Transitions an entry to `refunded`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `TerminalStatus`, or a database error.
    pub async fn mark_refunded(&self, id: Uuid) -> Result<transactions::Model, TransactionError> {
        mark_status_on(&self.db, id, TransactionStatus::Refunded).await
    }

    /// Transitions an entry to `failed`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `TerminalStatus`, or a database error.
    pub async fn mark_failed(&self, id: Uuid) -> Result<transactions::Model, TransactionError> {
        mark_status_on(&self.db, id, TransactionStatus::Failed).await
    }

    /// Transitions an entry to `pending_refund`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `TerminalStatus`, or a database error.
    pub async fn mark_pending_refund(
        &self,
        id: Uuid,
    ) -> Result<transactions::Model, TransactionError> {
        mark_status_on(&self.db, id, TransactionStatus::PendingRefund).await
    }
}

/// SQL filter selecting entries that count toward a balance: whitelist
/// statuses plus NULL-legacy rows.
pub(crate) fn counted_condition() -> Condition {
    Condition::any()
        .add(transactions::Column::Status.is_in(counted_statuses()))
        .add(transactions::Column::Status.is_null())
}

/// Inserts one entry on any connection. Does NOT refresh the wallet cache;
/// callers own that within their unit of work.
pub(crate) async fn append_on<C: ConnectionTrait>(
    conn: &C,
    entry: NewEntry,
) -> Result<transactions::Model, TransactionError> {
    if entry.amount.is_zero() {
        return Err(TransactionError::ZeroAmount);
    }

    let active = transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        wallet_id: Set(entry.wallet_id),
        amount: Set(entry.amount),
        entry_type: Set(sea_orm_active_enums::TransactionType::from(entry.entry_type)),
        status: Set(entry
            .status
            .map(sea_orm_active_enums::TransactionStatus::from)),
        description: Set(entry.description),
        order_id: Set(entry.order_id),
        plan_id: Set(entry.plan_id),
        related_transaction_id: Set(entry.related_transaction_id),
        created_at: Set(chrono::Utc::now().into()),
    };

    let inserted = active.insert(conn).await?;
    Ok(inserted)
}

/// Finds all entries correlated to an order on any connection.
pub(crate) async fn find_by_order_on<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<transactions::Model>, TransactionError> {
    let entries = transactions::Entity::find()
        .filter(transactions::Column::OrderId.eq(order_id))
        .order_by_asc(transactions::Column::CreatedAt)
        .all(conn)
        .await?;
    Ok(entries)
}

/// Applies one narrow status transition on any connection.
///
/// Terminal entries (refunded, failed, cancelled, rejected) never
/// transition again.
pub(crate) async fn mark_status_on<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    status: TransactionStatus,
) -> Result<transactions::Model, TransactionError> {
    let entry = transactions::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(TransactionError::NotFound(id))?;

    if let Some(current) = &entry.status {
        let current = TransactionStatus::from(current.clone());
        if current.is_terminal() {
            return Err(TransactionError::TerminalStatus { id, status: current });
        }
    }

    let mut active: transactions::ActiveModel = entry.into();
    active.status = Set(Some(sea_orm_active_enums::TransactionStatus::from(status)));
    let updated = active.update(conn).await?;
    Ok(updated)
}
