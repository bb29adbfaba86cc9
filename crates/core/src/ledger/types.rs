//! Ledger entry types and statuses.

use serde::{Deserialize, Serialize};

/// Classification of a ledger entry by direction/origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Money entering the wallet (positive amount).
    Credit,
    /// Money leaving the wallet (negative amount).
    Debit,
    /// Money returned to the wallet by a refund flow (positive amount).
    Refund,
}

/// Settlement status of a ledger entry.
///
/// Entries are immutable after insert except for the narrow status
/// transitions performed by the orchestrator (completed -> refunded,
/// pending -> failed). The persisted column is nullable: legacy rows with
/// no status are treated as settled by [`super::policy::counts_toward_balance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Settled entry.
    Completed,
    /// Awaiting settlement; already counted toward the balance.
    Pending,
    /// A refund for this entry has been requested but not yet applied.
    PendingRefund,
    /// The entry's movement has been reversed by a refund flow.
    Refunded,
    /// The movement never settled.
    Failed,
    /// The movement was cancelled before settling.
    Cancelled,
    /// The movement was rejected by the gateway or an operator.
    Rejected,
}

impl EntryType {
    /// Returns the canonical string form stored in the database enum.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Refund => "refund",
        }
    }
}

impl TransactionStatus {
    /// Returns the canonical string form stored in the database enum.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::PendingRefund => "pending_refund",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Returns true if the entry can still transition to another status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Refunded | Self::Failed | Self::Cancelled | Self::Rejected)
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_strings() {
        assert_eq!(EntryType::Credit.as_str(), "credit");
        assert_eq!(EntryType::Debit.as_str(), "debit");
        assert_eq!(EntryType::Refund.as_str(), "refund");
    }

    #[test]
    fn test_status_terminality() {
        assert!(!TransactionStatus::Completed.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::PendingRefund.is_terminal());
        assert!(TransactionStatus::Refunded.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());
        assert!(TransactionStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_status_serde_form() {
        let json = serde_json::to_string(&TransactionStatus::PendingRefund).unwrap();
        assert_eq!(json, "\"pending_refund\"");
    }
}
