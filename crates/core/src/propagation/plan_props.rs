//! Property tests for propagation planning.
//!
//! These properties hold for ALL valid purchase inputs, not just the
//! hand-picked scenarios in the unit tests:
//! - every plan nets to zero in aggregate
//! - the platform general wallet nets to zero per purchase and per refund
//! - a refund cancels its purchase role by role
//! - parent links always form a forest

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::{estimate_split, plan_purchase, plan_refund, CostSplit, PurchaseAmounts, WalletRole};

/// Cent-denominated amounts up to $100,000.00.
fn cents(max: i64) -> impl Strategy<Value = Decimal> {
    (0i64..=max).prop_map(|n| Decimal::new(n, 2))
}

/// (retail, cost, tax) triples accepted by `PurchaseAmounts::new`.
fn purchase_amounts() -> impl Strategy<Value = PurchaseAmounts> {
    (1i64..=10_000_000, cents(1_000_000))
        .prop_flat_map(|(retail_cents, tax)| {
            (Just(retail_cents), 0i64..=retail_cents, Just(tax))
        })
        .prop_map(|(retail_cents, cost_cents, tax)| {
            PurchaseAmounts::new(
                Decimal::new(retail_cents, 2),
                Decimal::new(cost_cents, 2),
                tax,
            )
            .expect("strategy generates valid amounts")
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Money leaves the payer and lands, in full, in the platform hierarchy.
    #[test]
    fn prop_purchase_conserves_money(amounts in purchase_amounts()) {
        let plan = plan_purchase(amounts).unwrap();
        prop_assert_eq!(plan.net_total(), Decimal::ZERO);
    }

    /// The platform general wallet is a pass-through for every purchase
    /// individually, not just on average.
    #[test]
    fn prop_purchase_platform_general_passes_through(amounts in purchase_amounts()) {
        let plan = plan_purchase(amounts).unwrap();
        prop_assert_eq!(plan.net_for_role(WalletRole::PlatformGeneral), Decimal::ZERO);
    }

    /// Role-level nets match the business decomposition.
    #[test]
    fn prop_purchase_role_nets(amounts in purchase_amounts()) {
        let plan = plan_purchase(amounts).unwrap();
        prop_assert_eq!(
            plan.net_for_role(WalletRole::PayerGeneral),
            -(amounts.retail + amounts.tax)
        );
        prop_assert_eq!(plan.net_for_role(WalletRole::PlatformProfit), amounts.profit());
        prop_assert_eq!(plan.net_for_role(WalletRole::PlatformProviderCost), amounts.cost);
        prop_assert_eq!(plan.net_for_role(WalletRole::PlatformTax), amounts.tax);
    }

    /// Refunding with the true split restores every wallet role exactly.
    #[test]
    fn prop_refund_cancels_purchase(amounts in purchase_amounts()) {
        let purchase = plan_purchase(amounts).unwrap();
        let split = CostSplit::new(amounts.profit(), amounts.cost);
        let refund = plan_refund(amounts, split).unwrap();

        for role in [
            WalletRole::PayerGeneral,
            WalletRole::PlatformGeneral,
            WalletRole::PlatformProfit,
            WalletRole::PlatformProviderCost,
            WalletRole::PlatformTax,
        ] {
            prop_assert_eq!(
                purchase.net_for_role(role) + refund.net_for_role(role),
                Decimal::ZERO
            );
        }
    }

    /// The conservative estimate always yields a valid, payer-whole refund:
    /// the payer recovers the full charge even when the split is unknown.
    #[test]
    fn prop_estimated_refund_makes_payer_whole(amounts in purchase_amounts()) {
        let refund = plan_refund(amounts, estimate_split(amounts.retail)).unwrap();
        prop_assert_eq!(
            refund.net_for_role(WalletRole::PayerGeneral),
            amounts.retail + amounts.tax
        );
        prop_assert_eq!(refund.net_total(), Decimal::ZERO);
        prop_assert_eq!(refund.net_for_role(WalletRole::PlatformGeneral), Decimal::ZERO);
    }

    /// Parent links always point backwards: the audit tree is a forest.
    #[test]
    fn prop_parent_links_form_forest(amounts in purchase_amounts()) {
        let purchase = plan_purchase(amounts).unwrap();
        let refund = plan_refund(
            amounts,
            CostSplit::new(amounts.profit(), amounts.cost),
        )
        .unwrap();

        for plan in [&purchase, &refund] {
            for (i, entry) in plan.entries().iter().enumerate() {
                if let Some(parent) = entry.parent {
                    prop_assert!(parent < i);
                }
            }
        }
    }

    /// Plans never contain zero-amount entries.
    #[test]
    fn prop_no_zero_entries(amounts in purchase_amounts()) {
        let plan = plan_purchase(amounts).unwrap();
        prop_assert!(plan.entries().iter().all(|e| !e.amount.is_zero()));
    }
}
