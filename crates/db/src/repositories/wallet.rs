//! Wallet registry for wallet lifecycle and balance database operations.
//!
//! Wallets are keyed by (owner, kind) and created idempotently: the
//! UNIQUE(owner_id, kind) constraint resolves concurrent first-access races,
//! and the loser of the race re-reads the winner's row. Cached balances are
//! derived values; the transaction history stays authoritative.

use centime_core::wallet::{kinds_for_owner, WalletKind};
use centime_shared::{Currency, Money};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::transaction::counted_condition;
use crate::entities::{sea_orm_active_enums, transactions, wallets};

/// Error types for wallet operations.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// No wallet exists for the (owner, kind) pair.
    #[error("Wallet not found for owner {owner_id} kind {kind}")]
    NotFound {
        /// The owner the lookup was for.
        owner_id: Uuid,
        /// The wallet kind the lookup was for.
        kind: WalletKind,
    },

    /// No wallet exists with the given id.
    #[error("Wallet not found: {0}")]
    IdNotFound(Uuid),

    /// The wallet row carries a currency code the system does not know.
    #[error("Wallet {wallet_id} has unknown currency '{currency}'")]
    InvalidCurrency {
        /// The wallet id.
        wallet_id: Uuid,
        /// The unparseable currency code.
        currency: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Wallet registry for lifecycle and balance operations.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
}

impl WalletRepository {
    /// Creates a new wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the wallet for (owner, kind), creating it with a zero balance
    /// if it does not exist yet.
    ///
    /// Safe under concurrent first access: a lost creation race re-reads and
    /// returns the winner's row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_or_create(
        &self,
        owner_id: Uuid,
        kind: WalletKind,
        currency: Currency,
    ) -> Result<wallets::Model, WalletError> {
        get_or_create_on(&self.db, owner_id, kind, currency).await
    }

    /// Finds the wallet for (owner, kind).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(
        &self,
        owner_id: Uuid,
        kind: WalletKind,
    ) -> Result<Option<wallets::Model>, WalletError> {
        find_on(&self.db, owner_id, kind).await
    }

    /// Finds the wallet for (owner, kind), failing with `NotFound` when it
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing wallet or a database error.
    pub async fn require(
        &self,
        owner_id: Uuid,
        kind: WalletKind,
    ) -> Result<wallets::Model, WalletError> {
        find_on(&self.db, owner_id, kind)
            .await?
            .ok_or(WalletError::NotFound { owner_id, kind })
    }

    /// Provisions an owner's wallet set inside one database transaction.
    ///
    /// The platform operator gets the full hierarchy (general, profit,
    /// provider_cost, tax, fee); ordinary owners get `general` only.
    /// Idempotent: existing wallets are returned, not duplicated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn provision_owner(
        &self,
        owner_id: Uuid,
        is_platform: bool,
        currency: Currency,
    ) -> Result<Vec<wallets::Model>, WalletError> {
        let txn = self.db.begin().await?;

        let mut provisioned = Vec::new();
        for &kind in kinds_for_owner(is_platform) {
            provisioned.push(get_or_create_on(&txn, owner_id, kind, currency).await?);
        }

        txn.commit().await?;

        tracing::info!(
            %owner_id,
            is_platform,
            wallets = provisioned.len(),
            "provisioned owner wallets"
        );
        Ok(provisioned)
    }

    /// Lists all wallets of an owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<wallets::Model>, WalletError> {
        let wallets = wallets::Entity::find()
            .filter(wallets::Column::OwnerId.eq(owner_id))
            .order_by_asc(wallets::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(wallets)
    }

    /// Deletes all wallets of an owner. Transactions cascade.
    ///
    /// Used only by owner deletion; wallets are never deleted in normal
    /// ledger operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn delete_owner_wallets(&self, owner_id: Uuid) -> Result<u64, WalletError> {
        let result = wallets::Entity::delete_many()
            .filter(wallets::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Returns the cached balance of (owner, kind) as typed money.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing wallet, `InvalidCurrency` for an
    /// unparseable currency code, or a database error.
    pub async fn get_balance(&self, owner_id: Uuid, kind: WalletKind) -> Result<Money, WalletError> {
        let wallet = self.require(owner_id, kind).await?;
        let currency: Currency =
            wallet
                .currency
                .parse()
                .map_err(|_| WalletError::InvalidCurrency {
                    wallet_id: wallet.id,
                    currency: wallet.currency.clone(),
                })?;
        Ok(Money::new(wallet.balance, currency))
    }

    /// Derives the wallet's balance from its transaction history.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn derive_balance(&self, wallet_id: Uuid) -> Result<Decimal, WalletError> {
        derive_balance_on(&self.db, wallet_id).await
    }

    /// Recomputes the wallet's balance from history and writes the cache.
    ///
    /// # Errors
    ///
    /// Returns `IdNotFound` for a missing wallet or a database error.
    pub async fn refresh_cached_balance(&self, wallet_id: Uuid) -> Result<Decimal, WalletError> {
        refresh_cached_balance_on(&self.db, wallet_id).await
    }
}

/// Row shape for the SUM(amount) derivation query.
#[derive(Debug, sea_orm::FromQueryResult)]
struct BalanceSum {
    total: Option<Decimal>,
}

/// Derives a balance on any connection (pool or open transaction).
///
/// `SUM(amount)` over the counted statuses, NULL-legacy rows included.
pub(crate) async fn derive_balance_on<C: ConnectionTrait>(
    conn: &C,
    wallet_id: Uuid,
) -> Result<Decimal, WalletError> {
    let sum = transactions::Entity::find()
        .select_only()
        .column_as(transactions::Column::Amount.sum(), "total")
        .filter(transactions::Column::WalletId.eq(wallet_id))
        .filter(counted_condition())
        .into_model::<BalanceSum>()
        .one(conn)
        .await?;

    Ok(sum.and_then(|row| row.total).unwrap_or(Decimal::ZERO))
}

/// Recomputes and persists a wallet's cached balance on any connection.
pub(crate) async fn refresh_cached_balance_on<C: ConnectionTrait>(
    conn: &C,
    wallet_id: Uuid,
) -> Result<Decimal, WalletError> {
    let wallet = wallets::Entity::find_by_id(wallet_id)
        .one(conn)
        .await?
        .ok_or(WalletError::IdNotFound(wallet_id))?;

    let derived = derive_balance_on(conn, wallet_id).await?;

    let mut active: wallets::ActiveModel = wallet.into();
    active.balance = Set(derived);
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(conn).await?;

    Ok(derived)
}

/// Finds a wallet by (owner, kind) on any connection.
pub(crate) async fn find_on<C: ConnectionTrait>(
    conn: &C,
    owner_id: Uuid,
    kind: WalletKind,
) -> Result<Option<wallets::Model>, WalletError> {
    let wallet = wallets::Entity::find()
        .filter(wallets::Column::OwnerId.eq(owner_id))
        .filter(wallets::Column::Kind.eq(sea_orm_active_enums::WalletKind::from(kind)))
        .one(conn)
        .await?;
    Ok(wallet)
}

/// Creates the wallet for (owner, kind) if absent, on any connection.
pub(crate) async fn get_or_create_on<C: ConnectionTrait>(
    conn: &C,
    owner_id: Uuid,
    kind: WalletKind,
    currency: Currency,
) -> Result<wallets::Model, WalletError> {
    if let Some(existing) = find_on(conn, owner_id, kind).await? {
        return Ok(existing);
    }

    let now = chrono::Utc::now().into();
    let wallet = wallets::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        kind: Set(sea_orm_active_enums::WalletKind::from(kind)),
        currency: Set(currency.to_string()),
        balance: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
    };

    match wallet.insert(conn).await {
        Ok(created) => Ok(created),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            // Lost the creation race; the winner's row is authoritative.
            find_on(conn, owner_id, kind)
                .await?
                .ok_or(WalletError::NotFound { owner_id, kind })
        }
        Err(err) => Err(err.into()),
    }
}

/// Acquires pessimistic row locks on the given wallets in ascending-id
/// order, returning the locked rows.
///
/// The fixed order prevents deadlock between concurrent propagations that
/// touch overlapping wallet sets. Must run inside an open transaction or
/// the locks are released immediately.
pub(crate) async fn lock_for_update_on<C: ConnectionTrait>(
    conn: &C,
    wallet_ids: &[Uuid],
) -> Result<Vec<wallets::Model>, WalletError> {
    let mut ordered: Vec<Uuid> = wallet_ids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let mut locked = Vec::with_capacity(ordered.len());
    for wallet_id in ordered {
        let wallet = wallets::Entity::find_by_id(wallet_id)
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or(WalletError::IdNotFound(wallet_id))?;
        locked.push(wallet);
    }
    Ok(locked)
}
