//! Propagation orchestrator: multi-wallet entry sets for business events.
//!
//! Each public operation plans its entry set in `centime-core`, then
//! executes the plan inside ONE database transaction: ordered row locks on
//! every touched wallet, sufficiency check after the locks are held, entry
//! inserts with parent links, and cache refreshes. Either the whole set
//! commits or none of it does.

use std::collections::{HashMap, HashSet};

use centime_core::ledger::{EntryType, LedgerError, TransactionStatus};
use centime_core::propagation::{
    estimate_split, plan_purchase, plan_refund, CostSplit, PropagationPlan, PurchaseAmounts,
    WalletRole,
};
use centime_core::wallet::WalletKind;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, TransactionTrait};
use uuid::Uuid;

use super::is_lock_conflict;
use super::transaction::{
    append_on, find_by_order_on, mark_status_on, NewEntry, TransactionError,
};
use super::wallet::{
    derive_balance_on, find_on, lock_for_update_on, refresh_cached_balance_on, WalletError,
};
use crate::entities::{sea_orm_active_enums, transactions, wallets};

/// Error types for propagation operations.
#[derive(Debug, thiserror::Error)]
pub enum PropagationError {
    /// No wallet exists for the (owner, kind) pair the event must touch.
    #[error("Wallet not found for owner {owner_id} kind {kind}")]
    WalletNotFound {
        /// The owner the lookup was for.
        owner_id: Uuid,
        /// The wallet kind the lookup was for.
        kind: WalletKind,
    },

    /// No ledger entries exist for the order.
    #[error("No ledger entries found for order {0}")]
    OrderNotFound(Uuid),

    /// The order was already refunded.
    #[error("Order {0} is already refunded")]
    AlreadyRefunded(Uuid),

    /// The debited wallet cannot cover the requested amount. Raised only
    /// after row locks are held.
    #[error("Insufficient funds in wallet {wallet_id}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The wallet that would go negative.
        wallet_id: Uuid,
        /// Its derived balance at lock time.
        available: Decimal,
        /// The total debit the event requires.
        requested: Decimal,
    },

    /// Lock or statement timeout contention; the caller may retry.
    #[error("Concurrent propagation conflict, please retry")]
    ConcurrencyConflict,

    /// Existing ledger entries cannot be interpreted. Surfaced to
    /// operators, never to end users.
    #[error("Inconsistent ledger state: {0}")]
    InconsistentLedger(String),

    /// Amount or plan validation failed.
    #[error(transparent)]
    Plan(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl PropagationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::WalletNotFound { .. } => "WALLET_NOT_FOUND",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::AlreadyRefunded(_) => "ALREADY_REFUNDED",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::InconsistentLedger(_) => "INCONSISTENT_LEDGER",
            Self::Plan(_) => "INVALID_PLAN",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }

    fn from_db(err: DbErr) -> Self {
        if is_lock_conflict(&err) {
            Self::ConcurrencyConflict
        } else {
            Self::Database(err)
        }
    }
}

impl From<DbErr> for PropagationError {
    fn from(err: DbErr) -> Self {
        Self::from_db(err)
    }
}

impl From<WalletError> for PropagationError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NotFound { owner_id, kind } => Self::WalletNotFound { owner_id, kind },
            WalletError::IdNotFound(id) => {
                Self::InconsistentLedger(format!("wallet {id} vanished mid-propagation"))
            }
            WalletError::InvalidCurrency {
                wallet_id,
                currency,
            } => Self::InconsistentLedger(format!(
                "wallet {wallet_id} has unknown currency '{currency}'"
            )),
            WalletError::Database(e) => Self::from_db(e),
        }
    }
}

impl From<TransactionError> for PropagationError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::NotFound(id) => {
                Self::InconsistentLedger(format!("entry {id} vanished mid-propagation"))
            }
            TransactionError::ZeroAmount => Self::Plan(LedgerError::ZeroAmount),
            TransactionError::TerminalStatus { id, status } => {
                Self::InconsistentLedger(format!("entry {id} is already {status}"))
            }
            TransactionError::Wallet(e) => Self::from(e),
            TransactionError::Database(e) => Self::from_db(e),
        }
    }
}

/// The complete set of entries one propagation created.
#[derive(Debug, Clone)]
pub struct TransactionSet {
    /// Created entries, in plan order.
    pub entries: Vec<transactions::Model>,
    /// True when a conservative estimate was used and operators should
    /// review the set.
    pub audit_flagged: bool,
}

impl TransactionSet {
    /// Signed sum of every entry in the set.
    #[must_use]
    pub fn net_total(&self) -> Decimal {
        self.entries.iter().map(|e| e.amount).sum()
    }
}

/// Orchestrates multi-wallet propagation for purchases, refunds, and
/// adjustments.
#[derive(Debug, Clone)]
pub struct PropagationOrchestrator {
    db: DatabaseConnection,
    platform_owner_id: Uuid,
}

impl PropagationOrchestrator {
    /// Creates a new orchestrator targeting the given platform operator.
    #[must_use]
    pub const fn new(db: DatabaseConnection, platform_owner_id: Uuid) -> Self {
        Self {
            db,
            platform_owner_id,
        }
    }

    /// The platform operator whose hierarchy receives propagated entries.
    #[must_use]
    pub const fn platform_owner_id(&self) -> Uuid {
        self.platform_owner_id
    }

    /// Records one purchase across the payer and platform wallets.
    ///
    /// Debits the payer by retail + tax, passes the retail amount through
    /// the platform general wallet, and routes profit, provider cost, and
    /// tax onward. The platform general wallet's net change is exactly
    /// zero. The whole set commits atomically or not at all.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` when the payer cannot cover the charge (checked
    /// after locks are held), `WalletNotFound` for missing wallets, or a
    /// validation/database error.
    pub async fn record_purchase(
        &self,
        payer_owner_id: Uuid,
        order_id: Uuid,
        plan_id: Option<Uuid>,
        amounts: PurchaseAmounts,
    ) -> Result<TransactionSet, PropagationError> {
        let plan = plan_purchase(amounts)?;
        let by_role = self.resolve_roles(payer_owner_id, &plan.roles()).await?;

        let txn = self.db.begin().await.map_err(PropagationError::from_db)?;

        let ids: Vec<Uuid> = by_role.values().map(|w| w.id).collect();
        lock_for_update_on(&txn, &ids).await?;

        let payer = &by_role[&WalletRole::PayerGeneral];
        let requested = plan.debit_for_role(WalletRole::PayerGeneral);
        let available = derive_balance_on(&txn, payer.id).await?;
        if available < requested {
            return Err(PropagationError::InsufficientFunds {
                wallet_id: payer.id,
                available,
                requested,
            });
        }

        let entries = execute_plan_on(
            &txn,
            &plan,
            &by_role,
            Some(order_id),
            plan_id,
            &format!("Order {order_id}"),
            false,
        )
        .await?;

        txn.commit().await.map_err(PropagationError::from_db)?;

        tracing::info!(
            %payer_owner_id,
            %order_id,
            retail = %amounts.retail,
            cost = %amounts.cost,
            tax = %amounts.tax,
            entries = entries.len(),
            "purchase recorded"
        );
        Ok(TransactionSet {
            entries,
            audit_flagged: false,
        })
    }

    /// Records the refund of a previously recorded purchase, located by its
    /// order id.
    ///
    /// Re-credits the payer the full charge, reverses the profit and
    /// provider-cost movements through the platform general wallet, and
    /// reverses any tax credit. The original payer charge transitions to
    /// `refunded`. When the original split entries cannot be located, a
    /// conservative estimate is used and the set is flagged for audit
    /// instead of aborting.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` when no entries exist for the order,
    /// `AlreadyRefunded` on double refund, `InconsistentLedger` when the
    /// original entries cannot be interpreted, or a database error.
    pub async fn record_refund(&self, order_id: Uuid) -> Result<TransactionSet, PropagationError> {
        let originals = find_by_order_on(&self.db, order_id).await?;
        if originals.is_empty() {
            return Err(PropagationError::OrderNotFound(order_id));
        }
        if originals
            .iter()
            .any(|e| e.entry_type == sea_orm_active_enums::TransactionType::Refund)
        {
            return Err(PropagationError::AlreadyRefunded(order_id));
        }

        let platform = self.platform_wallets().await?;
        let platform_ids: HashSet<Uuid> = platform.values().map(|w| w.id).collect();

        // The purchase root is the payer charge: the debit on a
        // non-platform wallet.
        let root = originals
            .iter()
            .find(|e| e.amount.is_sign_negative() && !platform_ids.contains(&e.wallet_id))
            .ok_or_else(|| {
                PropagationError::InconsistentLedger(format!(
                    "order {order_id} has entries but no payer charge"
                ))
            })?;
        if root.status == Some(sea_orm_active_enums::TransactionStatus::Refunded) {
            return Err(PropagationError::AlreadyRefunded(order_id));
        }

        let payer_wallet = wallets::Entity::find_by_id(root.wallet_id)
            .one(&self.db)
            .await
            .map_err(PropagationError::from_db)?
            .ok_or_else(|| {
                PropagationError::InconsistentLedger(format!(
                    "payer wallet {} for order {order_id} no longer exists",
                    root.wallet_id
                ))
            })?;

        let (amounts, split, audit_flagged) =
            reconstruct_refund(order_id, &originals, root, &platform)?;
        let plan = plan_refund(amounts, split)?;

        let mut by_role: HashMap<WalletRole, wallets::Model> = HashMap::new();
        for role in plan.roles() {
            let wallet = match role {
                WalletRole::PayerGeneral => payer_wallet.clone(),
                WalletRole::PlatformGeneral => platform[&WalletKind::General].clone(),
                WalletRole::PlatformProfit => platform[&WalletKind::Profit].clone(),
                WalletRole::PlatformProviderCost => platform[&WalletKind::ProviderCost].clone(),
                WalletRole::PlatformTax => platform[&WalletKind::Tax].clone(),
            };
            by_role.insert(role, wallet);
        }

        let txn = self.db.begin().await.map_err(PropagationError::from_db)?;

        let ids: Vec<Uuid> = by_role.values().map(|w| w.id).collect();
        lock_for_update_on(&txn, &ids).await?;

        let entries = execute_plan_on(
            &txn,
            &plan,
            &by_role,
            Some(order_id),
            root.plan_id,
            &format!("Order {order_id} refund"),
            audit_flagged,
        )
        .await?;

        // A concurrent refund that committed first leaves the root terminal;
        // this transaction then rolls back its entries here.
        mark_status_on(&txn, root.id, TransactionStatus::Refunded)
            .await
            .map_err(|err| match err {
                TransactionError::TerminalStatus { .. } => {
                    PropagationError::AlreadyRefunded(order_id)
                }
                other => other.into(),
            })?;

        txn.commit().await.map_err(PropagationError::from_db)?;

        tracing::info!(
            %order_id,
            refunded = %amounts.total_charge(),
            audit_flagged,
            entries = entries.len(),
            "refund recorded"
        );
        Ok(TransactionSet {
            entries,
            audit_flagged,
        })
    }

    /// Records a plain credit or debit on one wallet.
    ///
    /// When the target is a non-general wallet of a non-platform owner, the
    /// entry is mirrored once to that owner's general wallet and once to
    /// the platform general wallet, so the platform general wallet reflects
    /// a superset view of system-wide activity. Mirrors carry
    /// `related_transaction_id` and are never themselves mirrored.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` for an uncovered debit (checked after locks are
    /// held), `WalletNotFound` for missing wallets, or a validation or
    /// database error.
    pub async fn record_adjustment(
        &self,
        owner_id: Uuid,
        kind: WalletKind,
        amount: Decimal,
        entry_type: EntryType,
        description: &str,
    ) -> Result<TransactionSet, PropagationError> {
        let amount = amount.round_dp(2);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount).into());
        }
        let signed = match entry_type {
            EntryType::Credit | EntryType::Refund => amount,
            EntryType::Debit => -amount,
        };

        let target = self.require_wallet(owner_id, kind).await?;

        let mirrored = kind != WalletKind::General && owner_id != self.platform_owner_id;
        let mut mirror_targets: Vec<wallets::Model> = Vec::new();
        if mirrored {
            mirror_targets.push(self.require_wallet(owner_id, WalletKind::General).await?);
            mirror_targets.push(
                self.require_wallet(self.platform_owner_id, WalletKind::General)
                    .await?,
            );
        }

        let txn = self.db.begin().await.map_err(PropagationError::from_db)?;

        let mut ids: Vec<Uuid> = vec![target.id];
        ids.extend(mirror_targets.iter().map(|w| w.id));
        lock_for_update_on(&txn, &ids).await?;

        if signed.is_sign_negative() {
            let available = derive_balance_on(&txn, target.id).await?;
            if available < amount {
                return Err(PropagationError::InsufficientFunds {
                    wallet_id: target.id,
                    available,
                    requested: amount,
                });
            }
        }

        let source = append_on(
            &txn,
            NewEntry::plain(
                target.id,
                signed,
                entry_type,
                TransactionStatus::Completed,
                description,
            ),
        )
        .await?;

        let mut entries = vec![source.clone()];
        // Only entries without a related_transaction_id are mirrored; the
        // mirrors themselves carry one, which terminates the propagation.
        if mirrored && source.related_transaction_id.is_none() {
            for mirror_wallet in &mirror_targets {
                let mut mirror = NewEntry::plain(
                    mirror_wallet.id,
                    signed,
                    entry_type,
                    TransactionStatus::Completed,
                    format!("{description} (mirrored)"),
                );
                mirror.related_transaction_id = Some(source.id);
                entries.push(append_on(&txn, mirror).await?);
            }
        }

        for wallet_id in ids {
            refresh_cached_balance_on(&txn, wallet_id).await?;
        }

        txn.commit().await.map_err(PropagationError::from_db)?;

        tracing::info!(
            %owner_id,
            kind = %kind,
            amount = %signed,
            mirrored,
            "adjustment recorded"
        );
        Ok(TransactionSet {
            entries,
            audit_flagged: false,
        })
    }

    /// Records a verified incoming payment from the gateway as a credit on
    /// the owner's general wallet.
    ///
    /// # Errors
    ///
    /// `WalletNotFound` when the owner has no general wallet, or a
    /// validation or database error.
    pub async fn record_incoming_payment(
        &self,
        owner_id: Uuid,
        amount: Decimal,
        external_ref: &str,
    ) -> Result<transactions::Model, PropagationError> {
        let amount = amount.round_dp(2);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount).into());
        }

        let wallet = self.require_wallet(owner_id, WalletKind::General).await?;

        let txn = self.db.begin().await.map_err(PropagationError::from_db)?;
        let entry = append_on(
            &txn,
            NewEntry::plain(
                wallet.id,
                amount,
                EntryType::Credit,
                TransactionStatus::Completed,
                format!("Incoming payment {external_ref}"),
            ),
        )
        .await?;
        refresh_cached_balance_on(&txn, wallet.id).await?;
        txn.commit().await.map_err(PropagationError::from_db)?;

        tracing::info!(%owner_id, amount = %amount, external_ref, "incoming payment recorded");
        Ok(entry)
    }

    /// Resolves plan roles to concrete wallet rows.
    async fn resolve_roles(
        &self,
        payer_owner_id: Uuid,
        roles: &[WalletRole],
    ) -> Result<HashMap<WalletRole, wallets::Model>, PropagationError> {
        let mut by_role = HashMap::with_capacity(roles.len());
        for &role in roles {
            let (owner_id, kind) = match role {
                WalletRole::PayerGeneral => (payer_owner_id, WalletKind::General),
                WalletRole::PlatformGeneral => (self.platform_owner_id, WalletKind::General),
                WalletRole::PlatformProfit => (self.platform_owner_id, WalletKind::Profit),
                WalletRole::PlatformProviderCost => {
                    (self.platform_owner_id, WalletKind::ProviderCost)
                }
                WalletRole::PlatformTax => (self.platform_owner_id, WalletKind::Tax),
            };
            by_role.insert(role, self.require_wallet(owner_id, kind).await?);
        }
        Ok(by_role)
    }

    /// The platform hierarchy wallets touched by purchase/refund flows.
    async fn platform_wallets(
        &self,
    ) -> Result<HashMap<WalletKind, wallets::Model>, PropagationError> {
        let mut wallets = HashMap::new();
        for kind in [
            WalletKind::General,
            WalletKind::Profit,
            WalletKind::ProviderCost,
            WalletKind::Tax,
        ] {
            wallets.insert(kind, self.require_wallet(self.platform_owner_id, kind).await?);
        }
        Ok(wallets)
    }

    async fn require_wallet(
        &self,
        owner_id: Uuid,
        kind: WalletKind,
    ) -> Result<wallets::Model, PropagationError> {
        find_on(&self.db, owner_id, kind)
            .await?
            .ok_or(PropagationError::WalletNotFound { owner_id, kind })
    }
}

/// Reconstructs the refund amounts and split from the order's original
/// entries. Falls back to the conservative estimate (zero profit, full
/// retail as provider cost) when the located split does not add up.
fn reconstruct_refund(
    order_id: Uuid,
    originals: &[transactions::Model],
    root: &transactions::Model,
    platform: &HashMap<WalletKind, wallets::Model>,
) -> Result<(PurchaseAmounts, CostSplit, bool), PropagationError> {
    let total_charge = -root.amount;

    let credits_on = |wallet_id: Uuid| -> Decimal {
        originals
            .iter()
            .filter(|e| e.wallet_id == wallet_id && e.amount.is_sign_positive())
            .map(|e| e.amount)
            .sum()
    };

    let tax = credits_on(platform[&WalletKind::Tax].id);
    let retail = total_charge - tax;
    if retail <= Decimal::ZERO {
        return Err(PropagationError::InconsistentLedger(format!(
            "order {order_id} charge {total_charge} does not cover its tax {tax}"
        )));
    }

    let located = CostSplit::new(
        credits_on(platform[&WalletKind::Profit].id),
        credits_on(platform[&WalletKind::ProviderCost].id),
    );

    let (split, audit_flagged) = if located.total() == retail {
        (located, false)
    } else {
        tracing::warn!(
            %order_id,
            %retail,
            located_profit = %located.profit,
            located_cost = %located.cost,
            "refund split entries missing or inconsistent; using conservative estimate"
        );
        (estimate_split(retail), true)
    };

    let amounts = PurchaseAmounts::new(retail, split.cost, tax)?;
    Ok((amounts, split, audit_flagged))
}

/// Inserts a validated plan's entries and refreshes every touched wallet's
/// cached balance. Runs on an open transaction the caller commits.
async fn execute_plan_on(
    txn: &DatabaseTransaction,
    plan: &PropagationPlan,
    by_role: &HashMap<WalletRole, wallets::Model>,
    order_id: Option<Uuid>,
    plan_id: Option<Uuid>,
    context: &str,
    audit: bool,
) -> Result<Vec<transactions::Model>, PropagationError> {
    let mut inserted: Vec<transactions::Model> = Vec::with_capacity(plan.len());

    for planned in plan.entries() {
        let wallet = by_role.get(&planned.role).ok_or_else(|| {
            PropagationError::InconsistentLedger(format!(
                "no wallet resolved for role {}",
                planned.role
            ))
        })?;

        let description = if audit {
            format!("{context}: {} [estimated split]", planned.memo)
        } else {
            format!("{context}: {}", planned.memo)
        };

        let entry = NewEntry {
            wallet_id: wallet.id,
            amount: planned.amount,
            entry_type: planned.entry_type,
            status: Some(TransactionStatus::Completed),
            description,
            order_id,
            plan_id,
            related_transaction_id: planned.parent.map(|idx| inserted[idx].id),
        };
        inserted.push(append_on(txn, entry).await?);
    }

    let mut refreshed: HashSet<Uuid> = HashSet::new();
    for entry in &inserted {
        if refreshed.insert(entry.wallet_id) {
            refresh_cached_balance_on(txn, entry.wallet_id).await?;
        }
    }

    Ok(inserted)
}
