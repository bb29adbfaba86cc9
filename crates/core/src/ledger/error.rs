//! Ledger error types for validation and planning errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::propagation::WalletRole;

/// Errors that can occur while validating amounts or building a
/// propagation plan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Retail amount must be strictly positive.
    #[error("Retail amount must be positive, got {0}")]
    NonPositiveRetail(Decimal),

    /// Wholesale cost cannot be negative.
    #[error("Wholesale cost cannot be negative, got {0}")]
    NegativeCost(Decimal),

    /// Wholesale cost cannot exceed the retail amount.
    #[error("Wholesale cost {cost} exceeds retail amount {retail}")]
    CostExceedsRetail {
        /// The wholesale cost.
        cost: Decimal,
        /// The retail amount.
        retail: Decimal,
    },

    /// Tax cannot be negative.
    #[error("Tax cannot be negative, got {0}")]
    NegativeTax(Decimal),

    /// Profit component of a split cannot be negative.
    #[error("Profit cannot be negative, got {0}")]
    NegativeProfit(Decimal),

    /// Entry amount cannot be zero.
    #[error("Entry amount cannot be zero")]
    ZeroAmount,

    /// Entry amount must be strictly positive.
    #[error("Entry amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// A built plan failed its conservation check.
    #[error("Propagation plan does not net to zero: residual {0}")]
    UnbalancedPlan(Decimal),

    /// A plan entry references a parent at or after its own position.
    #[error("Plan entry {entry} has a forward parent link")]
    InvalidParentLink {
        /// Index of the offending entry.
        entry: usize,
    },

    /// A built plan left a pass-through wallet with a nonzero net.
    #[error("Pass-through wallet {role} nets to {net}, expected zero")]
    PassThroughViolation {
        /// The wallet role that must net to zero.
        role: WalletRole,
        /// The residual net change.
        net: Decimal,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveRetail(_) => "NON_POSITIVE_RETAIL",
            Self::NegativeCost(_) => "NEGATIVE_COST",
            Self::CostExceedsRetail { .. } => "COST_EXCEEDS_RETAIL",
            Self::NegativeTax(_) => "NEGATIVE_TAX",
            Self::NegativeProfit(_) => "NEGATIVE_PROFIT",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::UnbalancedPlan(_) => "UNBALANCED_PLAN",
            Self::InvalidParentLink { .. } => "INVALID_PARENT_LINK",
            Self::PassThroughViolation { .. } => "PASS_THROUGH_VIOLATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        assert_eq!(
            LedgerError::NonPositiveRetail(dec!(0)).to_string(),
            "Retail amount must be positive, got 0"
        );
        assert_eq!(
            LedgerError::CostExceedsRetail {
                cost: dec!(40),
                retail: dec!(30),
            }
            .to_string(),
            "Wholesale cost 40 exceeds retail amount 30"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::ZeroAmount.error_code(), "ZERO_AMOUNT");
        assert_eq!(
            LedgerError::UnbalancedPlan(dec!(1)).error_code(),
            "UNBALANCED_PLAN"
        );
    }
}
