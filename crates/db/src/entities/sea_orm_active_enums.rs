//! `SeaORM` active enums mirroring the Postgres enum types.
//!
//! Conversions to and from the pure domain enums in `centime-core` live
//! here so repositories can build SQL filters from the core policy.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Postgres `wallet_kind` enum.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "wallet_kind")]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    #[sea_orm(string_value = "general")]
    General,
    #[sea_orm(string_value = "profit")]
    Profit,
    #[sea_orm(string_value = "provider_cost")]
    ProviderCost,
    #[sea_orm(string_value = "tax")]
    Tax,
    #[sea_orm(string_value = "fee")]
    Fee,
}

/// Postgres `transaction_type` enum.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[sea_orm(string_value = "credit")]
    Credit,
    #[sea_orm(string_value = "debit")]
    Debit,
    #[sea_orm(string_value = "refund")]
    Refund,
}

/// Postgres `transaction_status` enum. The column is nullable: legacy rows
/// carry no status and still count toward balances.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "pending_refund")]
    PendingRefund,
    #[sea_orm(string_value = "refunded")]
    Refunded,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl From<centime_core::wallet::WalletKind> for WalletKind {
    fn from(kind: centime_core::wallet::WalletKind) -> Self {
        use centime_core::wallet::WalletKind as Core;
        match kind {
            Core::General => Self::General,
            Core::Profit => Self::Profit,
            Core::ProviderCost => Self::ProviderCost,
            Core::Tax => Self::Tax,
            Core::Fee => Self::Fee,
        }
    }
}

impl From<WalletKind> for centime_core::wallet::WalletKind {
    fn from(kind: WalletKind) -> Self {
        use centime_core::wallet::WalletKind as Core;
        match kind {
            WalletKind::General => Core::General,
            WalletKind::Profit => Core::Profit,
            WalletKind::ProviderCost => Core::ProviderCost,
            WalletKind::Tax => Core::Tax,
            WalletKind::Fee => Core::Fee,
        }
    }
}

impl From<centime_core::ledger::EntryType> for TransactionType {
    fn from(entry_type: centime_core::ledger::EntryType) -> Self {
        use centime_core::ledger::EntryType as Core;
        match entry_type {
            Core::Credit => Self::Credit,
            Core::Debit => Self::Debit,
            Core::Refund => Self::Refund,
        }
    }
}

impl From<centime_core::ledger::TransactionStatus> for TransactionStatus {
    fn from(status: centime_core::ledger::TransactionStatus) -> Self {
        use centime_core::ledger::TransactionStatus as Core;
        match status {
            Core::Completed => Self::Completed,
            Core::Pending => Self::Pending,
            Core::PendingRefund => Self::PendingRefund,
            Core::Refunded => Self::Refunded,
            Core::Failed => Self::Failed,
            Core::Cancelled => Self::Cancelled,
            Core::Rejected => Self::Rejected,
        }
    }
}

impl From<TransactionStatus> for centime_core::ledger::TransactionStatus {
    fn from(status: TransactionStatus) -> Self {
        use centime_core::ledger::TransactionStatus as Core;
        match status {
            TransactionStatus::Completed => Core::Completed,
            TransactionStatus::Pending => Core::Pending,
            TransactionStatus::PendingRefund => Core::PendingRefund,
            TransactionStatus::Refunded => Core::Refunded,
            TransactionStatus::Failed => Core::Failed,
            TransactionStatus::Cancelled => Core::Cancelled,
            TransactionStatus::Rejected => Core::Rejected,
        }
    }
}

/// The statuses counted toward balances, in active-enum form for SQL
/// filters. Derived from the core whitelist so the two can never diverge.
#[must_use]
pub fn counted_statuses() -> Vec<TransactionStatus> {
    centime_core::ledger::COUNTED_STATUSES
        .iter()
        .map(|s| TransactionStatus::from(*s))
        .collect()
}
