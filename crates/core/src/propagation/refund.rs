//! Refund propagation planning.
//!
//! A refund is the mirror image of its purchase, located by the shared order
//! id rather than by parent links: the payer is re-credited the full charge,
//! the profit and provider-cost movements are reversed through the platform
//! general wallet, and any tax credit is reversed from the tax wallet.

use rust_decimal::Decimal;

use super::plan::{PlannedEntry, PropagationPlan, WalletRole};
use super::purchase::PurchaseAmounts;
use crate::ledger::{EntryType, LedgerError};

/// How the original retail amount was split between margin and provider cost.
///
/// Normally recovered from the purchase's profit/provider-cost entries.
/// When those cannot be located, [`estimate_split`] supplies a conservative
/// stand-in and the refund proceeds flagged for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostSplit {
    /// The platform margin to pull back from the profit wallet.
    pub profit: Decimal,
    /// The wholesale amount to pull back from the provider-cost wallet.
    pub cost: Decimal,
}

impl CostSplit {
    /// Builds a split, normalizing to ledger precision.
    #[must_use]
    pub fn new(profit: Decimal, cost: Decimal) -> Self {
        Self {
            profit: profit.round_dp(2),
            cost: cost.round_dp(2),
        }
    }

    /// Sum of both components.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.profit + self.cost
    }
}

/// Conservative split estimate for a purchase whose original profit and
/// provider-cost entries cannot be located: assume no margin was taken, so
/// the entire retail amount is pulled back from the provider-cost wallet.
#[must_use]
pub fn estimate_split(retail: Decimal) -> CostSplit {
    CostSplit::new(Decimal::ZERO, retail.round_dp(2))
}

/// Plans the full entry set reversing one purchase.
///
/// Entry layout (parent links in brackets):
/// 1. payer general +(retail+tax) refund, the root of the refund tree
/// 2. platform profit −profit debit \[1\]
/// 3. platform general +profit credit \[2\]
/// 4. platform provider-cost −cost debit \[1\]
/// 5. platform general +cost credit \[4\]
/// 6. platform general −retail debit \[1\]
/// 7. platform tax −tax debit \[1\], only when tax was charged
///
/// Zero-amount movements are omitted. The plan nets to zero and the platform
/// general wallet nets to zero on its own, exactly as in the purchase.
///
/// # Errors
///
/// Returns `UnbalancedPlan` when the split does not add up to the retail
/// amount; callers fall back to [`estimate_split`] in that case.
pub fn plan_refund(
    amounts: PurchaseAmounts,
    split: CostSplit,
) -> Result<PropagationPlan, LedgerError> {
    if split.profit < Decimal::ZERO {
        return Err(LedgerError::NegativeProfit(split.profit));
    }
    if split.cost < Decimal::ZERO {
        return Err(LedgerError::NegativeCost(split.cost));
    }
    if split.total() != amounts.retail {
        return Err(LedgerError::UnbalancedPlan(split.total() - amounts.retail));
    }

    let mut plan = PropagationPlan::new();

    let root = plan.push(PlannedEntry {
        role: WalletRole::PayerGeneral,
        amount: amounts.total_charge(),
        entry_type: EntryType::Refund,
        parent: None,
        memo: "purchase refund",
    });

    if !split.profit.is_zero() {
        let reversal = plan.push(PlannedEntry {
            role: WalletRole::PlatformProfit,
            amount: -split.profit,
            entry_type: EntryType::Debit,
            parent: Some(root),
            memo: "profit reversal",
        });
        plan.push(PlannedEntry {
            role: WalletRole::PlatformGeneral,
            amount: split.profit,
            entry_type: EntryType::Credit,
            parent: Some(reversal),
            memo: "profit returned",
        });
    }

    if !split.cost.is_zero() {
        let reversal = plan.push(PlannedEntry {
            role: WalletRole::PlatformProviderCost,
            amount: -split.cost,
            entry_type: EntryType::Debit,
            parent: Some(root),
            memo: "provider cost reversal",
        });
        plan.push(PlannedEntry {
            role: WalletRole::PlatformGeneral,
            amount: split.cost,
            entry_type: EntryType::Credit,
            parent: Some(reversal),
            memo: "provider cost returned",
        });
    }

    plan.push(PlannedEntry {
        role: WalletRole::PlatformGeneral,
        amount: -amounts.retail,
        entry_type: EntryType::Debit,
        parent: Some(root),
        memo: "retail returned to payer",
    });

    if !amounts.tax.is_zero() {
        plan.push(PlannedEntry {
            role: WalletRole::PlatformTax,
            amount: -amounts.tax,
            entry_type: EntryType::Debit,
            parent: Some(root),
            memo: "tax reversal",
        });
    }

    plan.validate(&[WalletRole::PlatformGeneral])?;
    Ok(plan)
}
