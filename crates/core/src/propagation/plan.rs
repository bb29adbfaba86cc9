//! Propagation plan structure and conservation checks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{EntryType, LedgerError};

/// The wallet a planned entry targets, by role rather than by id.
///
/// Roles are resolved to concrete wallet rows by the orchestrator: the payer
/// role maps to the event owner's general wallet, the platform roles map to
/// the operator's hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletRole {
    /// The purchasing owner's general wallet.
    PayerGeneral,
    /// The platform operator's general (pass-through) wallet.
    PlatformGeneral,
    /// The platform operator's profit wallet.
    PlatformProfit,
    /// The platform operator's provider-cost wallet.
    PlatformProviderCost,
    /// The platform operator's tax wallet.
    PlatformTax,
}

impl std::fmt::Display for WalletRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PayerGeneral => "payer_general",
            Self::PlatformGeneral => "platform_general",
            Self::PlatformProfit => "platform_profit",
            Self::PlatformProviderCost => "platform_provider_cost",
            Self::PlatformTax => "platform_tax",
        };
        f.write_str(s)
    }
}

/// One entry of a propagation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    /// Which wallet the entry posts to.
    pub role: WalletRole,
    /// Signed amount: credits positive, debits negative.
    pub amount: Decimal,
    /// Entry classification.
    pub entry_type: EntryType,
    /// Index of the logical parent entry within the plan, if any.
    ///
    /// Always smaller than the entry's own index, so parent links form a
    /// forest by construction.
    pub parent: Option<usize>,
    /// Short memo describing the entry's purpose.
    pub memo: &'static str,
}

/// An ordered, validated set of planned ledger entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationPlan {
    entries: Vec<PlannedEntry>,
}

impl PropagationPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns its index for use as a parent link.
    pub fn push(&mut self, entry: PlannedEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// The planned entries in execution order.
    #[must_use]
    pub fn entries(&self) -> &[PlannedEntry] {
        &self.entries
    }

    /// Number of planned entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the plan contains no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Signed sum of every entry in the plan.
    #[must_use]
    pub fn net_total(&self) -> Decimal {
        self.entries.iter().map(|e| e.amount).sum()
    }

    /// Signed sum of the entries targeting one wallet role.
    #[must_use]
    pub fn net_for_role(&self, role: WalletRole) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.role == role)
            .map(|e| e.amount)
            .sum()
    }

    /// Total amount debited from a role (absolute value of its negative entries).
    #[must_use]
    pub fn debit_for_role(&self, role: WalletRole) -> Decimal {
        -self
            .entries
            .iter()
            .filter(|e| e.role == role && e.amount.is_sign_negative())
            .map(|e| e.amount)
            .sum::<Decimal>()
    }

    /// The distinct roles the plan touches, in first-appearance order.
    #[must_use]
    pub fn roles(&self) -> Vec<WalletRole> {
        let mut roles = Vec::new();
        for entry in &self.entries {
            if !roles.contains(&entry.role) {
                roles.push(entry.role);
            }
        }
        roles
    }

    /// Validates money conservation and structural integrity.
    ///
    /// Checks that the plan nets to zero in aggregate, that each
    /// `pass_through` role nets to zero individually, that no entry is
    /// zero-amount, and that every parent link points at an earlier entry.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self, pass_through: &[WalletRole]) -> Result<(), LedgerError> {
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.amount.is_zero() {
                return Err(LedgerError::ZeroAmount);
            }
            if let Some(parent) = entry.parent
                && parent >= i
            {
                return Err(LedgerError::InvalidParentLink { entry: i });
            }
        }

        let net = self.net_total();
        if !net.is_zero() {
            return Err(LedgerError::UnbalancedPlan(net));
        }

        for &role in pass_through {
            let net = self.net_for_role(role);
            if !net.is_zero() {
                return Err(LedgerError::PassThroughViolation { role, net });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(role: WalletRole, amount: Decimal, parent: Option<usize>) -> PlannedEntry {
        let entry_type = if amount.is_sign_negative() {
            EntryType::Debit
        } else {
            EntryType::Credit
        };
        PlannedEntry {
            role,
            amount,
            entry_type,
            parent,
            memo: "test",
        }
    }

    #[test]
    fn test_empty_plan_validates() {
        let plan = PropagationPlan::new();
        assert!(plan.validate(&[]).is_ok());
        assert_eq!(plan.net_total(), Decimal::ZERO);
    }

    #[test]
    fn test_net_for_role() {
        let mut plan = PropagationPlan::new();
        plan.push(entry(WalletRole::PayerGeneral, dec!(-30), None));
        plan.push(entry(WalletRole::PlatformGeneral, dec!(30), Some(0)));
        assert_eq!(plan.net_for_role(WalletRole::PayerGeneral), dec!(-30));
        assert_eq!(plan.net_for_role(WalletRole::PlatformGeneral), dec!(30));
        assert_eq!(plan.net_for_role(WalletRole::PlatformTax), Decimal::ZERO);
        assert_eq!(plan.net_total(), Decimal::ZERO);
    }

    #[test]
    fn test_debit_for_role_ignores_credits() {
        let mut plan = PropagationPlan::new();
        plan.push(entry(WalletRole::PlatformGeneral, dec!(30), None));
        plan.push(entry(WalletRole::PlatformGeneral, dec!(-20), Some(0)));
        plan.push(entry(WalletRole::PlatformGeneral, dec!(-10), Some(0)));
        assert_eq!(plan.debit_for_role(WalletRole::PlatformGeneral), dec!(30));
    }

    #[test]
    fn test_unbalanced_plan_rejected() {
        let mut plan = PropagationPlan::new();
        plan.push(entry(WalletRole::PayerGeneral, dec!(-30), None));
        plan.push(entry(WalletRole::PlatformGeneral, dec!(29), Some(0)));
        assert_eq!(
            plan.validate(&[]),
            Err(LedgerError::UnbalancedPlan(dec!(-1)))
        );
    }

    #[test]
    fn test_pass_through_violation_rejected() {
        let mut plan = PropagationPlan::new();
        plan.push(entry(WalletRole::PayerGeneral, dec!(-30), None));
        plan.push(entry(WalletRole::PlatformGeneral, dec!(30), Some(0)));
        let err = plan.validate(&[WalletRole::PlatformGeneral]).unwrap_err();
        assert_eq!(
            err,
            LedgerError::PassThroughViolation {
                role: WalletRole::PlatformGeneral,
                net: dec!(30),
            }
        );
    }

    #[test]
    fn test_zero_amount_entry_rejected() {
        let mut plan = PropagationPlan::new();
        plan.push(entry(WalletRole::PayerGeneral, dec!(0), None));
        assert_eq!(plan.validate(&[]), Err(LedgerError::ZeroAmount));
    }

    #[test]
    fn test_roles_first_appearance_order() {
        let mut plan = PropagationPlan::new();
        plan.push(entry(WalletRole::PayerGeneral, dec!(-10), None));
        plan.push(entry(WalletRole::PlatformGeneral, dec!(10), Some(0)));
        plan.push(entry(WalletRole::PlatformGeneral, dec!(-10), Some(1)));
        plan.push(entry(WalletRole::PlatformProfit, dec!(10), Some(2)));
        assert_eq!(
            plan.roles(),
            vec![
                WalletRole::PayerGeneral,
                WalletRole::PlatformGeneral,
                WalletRole::PlatformProfit,
            ]
        );
    }
}
