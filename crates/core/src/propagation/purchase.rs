//! Purchase propagation planning.
//!
//! One purchase fans out across the payer's wallet and the platform
//! hierarchy. The platform general wallet is a pass-through: the retail
//! amount lands there and is immediately routed onward to the profit and
//! provider-cost wallets, so its net change per purchase is exactly zero.

use rust_decimal::Decimal;

use super::plan::{PlannedEntry, PropagationPlan, WalletRole};
use crate::ledger::{EntryType, LedgerError};

/// Validated monetary inputs of one purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseAmounts {
    /// Retail price charged to the payer.
    pub retail: Decimal,
    /// Wholesale cost owed to the provider.
    pub cost: Decimal,
    /// Jurisdiction tax charged on top of retail. Zero when not applicable.
    pub tax: Decimal,
}

impl PurchaseAmounts {
    /// Builds purchase amounts, normalizing each value to ledger precision.
    ///
    /// # Errors
    ///
    /// Returns a validation error when retail is not positive, cost is
    /// negative or exceeds retail, or tax is negative.
    pub fn new(retail: Decimal, cost: Decimal, tax: Decimal) -> Result<Self, LedgerError> {
        let retail = retail.round_dp(2);
        let cost = cost.round_dp(2);
        let tax = tax.round_dp(2);

        if retail <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveRetail(retail));
        }
        if cost < Decimal::ZERO {
            return Err(LedgerError::NegativeCost(cost));
        }
        if cost > retail {
            return Err(LedgerError::CostExceedsRetail { cost, retail });
        }
        if tax < Decimal::ZERO {
            return Err(LedgerError::NegativeTax(tax));
        }

        Ok(Self { retail, cost, tax })
    }

    /// Platform margin: retail minus wholesale cost.
    #[must_use]
    pub fn profit(&self) -> Decimal {
        self.retail - self.cost
    }

    /// Total charged to the payer: retail plus tax.
    #[must_use]
    pub fn total_charge(&self) -> Decimal {
        self.retail + self.tax
    }
}

/// Plans the full entry set for one purchase.
///
/// Entry layout (parent links in brackets):
/// 1. payer general −(retail+tax) debit, the root of the tree
/// 2. platform general +retail credit \[1\]
/// 3. platform general −profit debit \[2\]
/// 4. platform general −cost debit \[2\]
/// 5. platform profit +profit credit \[3\]
/// 6. platform provider-cost +cost credit \[4\]
/// 7. platform tax +tax credit \[1\], only when tax was charged
///
/// Zero-amount movements (profit or cost of zero) are omitted. The returned
/// plan is validated: it nets to zero and the platform general wallet nets
/// to zero on its own.
///
/// # Errors
///
/// Returns a validation error if the built plan violates conservation
/// (cannot happen for amounts accepted by [`PurchaseAmounts::new`]).
pub fn plan_purchase(amounts: PurchaseAmounts) -> Result<PropagationPlan, LedgerError> {
    let profit = amounts.profit();
    let mut plan = PropagationPlan::new();

    let charge = plan.push(PlannedEntry {
        role: WalletRole::PayerGeneral,
        amount: -amounts.total_charge(),
        entry_type: EntryType::Debit,
        parent: None,
        memo: "purchase charge",
    });

    let receipt = plan.push(PlannedEntry {
        role: WalletRole::PlatformGeneral,
        amount: amounts.retail,
        entry_type: EntryType::Credit,
        parent: Some(charge),
        memo: "retail receipt",
    });

    if !profit.is_zero() {
        let routed = plan.push(PlannedEntry {
            role: WalletRole::PlatformGeneral,
            amount: -profit,
            entry_type: EntryType::Debit,
            parent: Some(receipt),
            memo: "profit allocation",
        });
        plan.push(PlannedEntry {
            role: WalletRole::PlatformProfit,
            amount: profit,
            entry_type: EntryType::Credit,
            parent: Some(routed),
            memo: "profit share",
        });
    }

    if !amounts.cost.is_zero() {
        let routed = plan.push(PlannedEntry {
            role: WalletRole::PlatformGeneral,
            amount: -amounts.cost,
            entry_type: EntryType::Debit,
            parent: Some(receipt),
            memo: "provider cost allocation",
        });
        plan.push(PlannedEntry {
            role: WalletRole::PlatformProviderCost,
            amount: amounts.cost,
            entry_type: EntryType::Credit,
            parent: Some(routed),
            memo: "provider cost",
        });
    }

    if !amounts.tax.is_zero() {
        // Tax bypasses the general wallet: collected from the payer,
        // credited straight to the tax wallet.
        plan.push(PlannedEntry {
            role: WalletRole::PlatformTax,
            amount: amounts.tax,
            entry_type: EntryType::Credit,
            parent: Some(charge),
            memo: "tax collected",
        });
    }

    plan.validate(&[WalletRole::PlatformGeneral])?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amounts_validation() {
        assert!(PurchaseAmounts::new(dec!(30), dec!(10), dec!(0)).is_ok());
        assert_eq!(
            PurchaseAmounts::new(dec!(0), dec!(0), dec!(0)),
            Err(LedgerError::NonPositiveRetail(dec!(0)))
        );
        assert_eq!(
            PurchaseAmounts::new(dec!(30), dec!(-1), dec!(0)),
            Err(LedgerError::NegativeCost(dec!(-1)))
        );
        assert_eq!(
            PurchaseAmounts::new(dec!(30), dec!(31), dec!(0)),
            Err(LedgerError::CostExceedsRetail {
                cost: dec!(31),
                retail: dec!(30),
            })
        );
        assert_eq!(
            PurchaseAmounts::new(dec!(30), dec!(10), dec!(-1)),
            Err(LedgerError::NegativeTax(dec!(-1)))
        );
    }

    #[test]
    fn test_amounts_normalized_to_cents() {
        let amounts = PurchaseAmounts::new(dec!(29.999), dec!(10.004), dec!(0)).unwrap();
        assert_eq!(amounts.retail, dec!(30.00));
        assert_eq!(amounts.cost, dec!(10.00));
    }

    #[test]
    fn test_plan_untaxed_purchase() {
        // Retail $30, cost $10.
        let amounts = PurchaseAmounts::new(dec!(30.00), dec!(10.00), dec!(0)).unwrap();
        let plan = plan_purchase(amounts).unwrap();

        assert_eq!(plan.len(), 6);
        assert_eq!(plan.net_total(), Decimal::ZERO);
        assert_eq!(plan.net_for_role(WalletRole::PayerGeneral), dec!(-30.00));
        assert_eq!(plan.net_for_role(WalletRole::PlatformGeneral), Decimal::ZERO);
        assert_eq!(plan.net_for_role(WalletRole::PlatformProfit), dec!(20.00));
        assert_eq!(
            plan.net_for_role(WalletRole::PlatformProviderCost),
            dec!(10.00)
        );
        assert_eq!(plan.net_for_role(WalletRole::PlatformTax), Decimal::ZERO);
    }

    #[test]
    fn test_plan_taxed_purchase() {
        // 5% tax on $100 retail: payer is charged $105, tax wallet gets $5,
        // profit and provider-cost splits are untouched by the tax.
        let amounts = PurchaseAmounts::new(dec!(100.00), dec!(40.00), dec!(5.00)).unwrap();
        let plan = plan_purchase(amounts).unwrap();

        assert_eq!(plan.net_for_role(WalletRole::PayerGeneral), dec!(-105.00));
        assert_eq!(plan.net_for_role(WalletRole::PlatformTax), dec!(5.00));
        assert_eq!(plan.net_for_role(WalletRole::PlatformProfit), dec!(60.00));
        assert_eq!(
            plan.net_for_role(WalletRole::PlatformProviderCost),
            dec!(40.00)
        );
        assert_eq!(plan.net_for_role(WalletRole::PlatformGeneral), Decimal::ZERO);

        // The tax entry's parent is the payer charge, not the retail receipt.
        let tax_entry = plan
            .entries()
            .iter()
            .find(|e| e.role == WalletRole::PlatformTax)
            .unwrap();
        assert_eq!(tax_entry.parent, Some(0));
    }

    #[test]
    fn test_plan_zero_margin_purchase() {
        // Sold at cost: no profit movement is planned.
        let amounts = PurchaseAmounts::new(dec!(10.00), dec!(10.00), dec!(0)).unwrap();
        let plan = plan_purchase(amounts).unwrap();

        assert_eq!(plan.net_for_role(WalletRole::PlatformProfit), Decimal::ZERO);
        assert!(plan
            .entries()
            .iter()
            .all(|e| e.role != WalletRole::PlatformProfit));
        assert_eq!(plan.net_for_role(WalletRole::PlatformGeneral), Decimal::ZERO);
        assert_eq!(plan.net_total(), Decimal::ZERO);
    }

    #[test]
    fn test_plan_root_is_payer_charge() {
        let amounts = PurchaseAmounts::new(dec!(30.00), dec!(10.00), dec!(1.50)).unwrap();
        let plan = plan_purchase(amounts).unwrap();

        let root = &plan.entries()[0];
        assert_eq!(root.role, WalletRole::PayerGeneral);
        assert_eq!(root.amount, dec!(-31.50));
        assert_eq!(root.entry_type, EntryType::Debit);
        assert_eq!(root.parent, None);

        // Every other entry has a parent.
        assert!(plan.entries()[1..].iter().all(|e| e.parent.is_some()));
    }

    #[test]
    fn test_payer_debit_total() {
        let amounts = PurchaseAmounts::new(dec!(30.00), dec!(10.00), dec!(1.50)).unwrap();
        let plan = plan_purchase(amounts).unwrap();
        assert_eq!(plan.debit_for_role(WalletRole::PayerGeneral), dec!(31.50));
    }
}
