//! Balance inclusion policy and derivation.
//!
//! A wallet's balance is never read from the cached column directly by the
//! ledger itself: it is the signed sum of the wallet's counted entries. The
//! inclusion policy is a whitelist over the status enum so that legacy rows
//! with a NULL status stay counted and newly added excluded statuses cannot
//! silently leak into balances.

use rust_decimal::Decimal;

use super::types::TransactionStatus;

/// Statuses whose entries count toward a wallet's balance.
///
/// `Refunded` stays counted: a refund appends compensating entries rather
/// than un-counting the original movement, otherwise a refunded purchase
/// would restore the payer twice.
pub const COUNTED_STATUSES: [TransactionStatus; 4] = [
    TransactionStatus::Completed,
    TransactionStatus::Pending,
    TransactionStatus::PendingRefund,
    TransactionStatus::Refunded,
];

/// Returns true if an entry with the given status counts toward the balance.
///
/// `None` is the legacy-row case and counts.
#[must_use]
pub fn counts_toward_balance(status: Option<TransactionStatus>) -> bool {
    match status {
        None => true,
        Some(s) => COUNTED_STATUSES.contains(&s),
    }
}

/// Derives a balance from `(amount, status)` pairs.
///
/// The database-backed derivation applies the same whitelist in SQL; this
/// form exists so the policy is testable without a database.
#[must_use]
pub fn derive_balance<I>(entries: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, Option<TransactionStatus>)>,
{
    entries
        .into_iter()
        .filter(|(_, status)| counts_toward_balance(*status))
        .map(|(amount, _)| amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_whitelist_members() {
        assert!(counts_toward_balance(Some(TransactionStatus::Completed)));
        assert!(counts_toward_balance(Some(TransactionStatus::Pending)));
        assert!(counts_toward_balance(Some(TransactionStatus::PendingRefund)));
        assert!(counts_toward_balance(Some(TransactionStatus::Refunded)));
    }

    #[test]
    fn test_excluded_statuses() {
        assert!(!counts_toward_balance(Some(TransactionStatus::Failed)));
        assert!(!counts_toward_balance(Some(TransactionStatus::Cancelled)));
        assert!(!counts_toward_balance(Some(TransactionStatus::Rejected)));
    }

    #[test]
    fn test_legacy_null_status_counts() {
        assert!(counts_toward_balance(None));
    }

    #[test]
    fn test_derive_balance_empty() {
        assert_eq!(derive_balance(std::iter::empty()), Decimal::ZERO);
    }

    #[test]
    fn test_derive_balance_mixed_statuses() {
        let entries = vec![
            (dec!(100.00), Some(TransactionStatus::Completed)),
            (dec!(-30.00), Some(TransactionStatus::Completed)),
            (dec!(500.00), Some(TransactionStatus::Failed)),
            (dec!(-500.00), Some(TransactionStatus::Cancelled)),
            (dec!(5.00), None),
        ];
        assert_eq!(derive_balance(entries), dec!(75.00));
    }

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (-1_000_000i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn status_strategy() -> impl Strategy<Value = Option<TransactionStatus>> {
        prop_oneof![
            Just(None),
            Just(Some(TransactionStatus::Completed)),
            Just(Some(TransactionStatus::Pending)),
            Just(Some(TransactionStatus::PendingRefund)),
            Just(Some(TransactionStatus::Refunded)),
            Just(Some(TransactionStatus::Failed)),
            Just(Some(TransactionStatus::Cancelled)),
            Just(Some(TransactionStatus::Rejected)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Excluded entries never move the balance: dropping them from the
        /// input yields the same derived value.
        #[test]
        fn prop_excluded_entries_are_inert(
            entries in prop::collection::vec((amount_strategy(), status_strategy()), 0..30),
        ) {
            let with_all = derive_balance(entries.clone());
            let counted_only: Vec<_> = entries
                .into_iter()
                .filter(|(_, s)| counts_toward_balance(*s))
                .collect();
            let without_excluded = derive_balance(counted_only);
            prop_assert_eq!(with_all, without_excluded);
        }

        /// Derivation is additive: splitting the entry list at any point and
        /// summing the two halves matches deriving over the whole list.
        #[test]
        fn prop_derivation_is_additive(
            entries in prop::collection::vec((amount_strategy(), status_strategy()), 0..30),
            split in 0usize..30,
        ) {
            let split = split.min(entries.len());
            let (a, b) = entries.split_at(split);
            let total = derive_balance(entries.iter().copied());
            let parts = derive_balance(a.iter().copied()) + derive_balance(b.iter().copied());
            prop_assert_eq!(total, parts);
        }

        /// The whitelist and the excluded set partition the status space.
        #[test]
        fn prop_whitelist_is_a_partition(status in status_strategy()) {
            let counted = counts_toward_balance(status);
            let excluded = matches!(
                status,
                Some(TransactionStatus::Failed)
                    | Some(TransactionStatus::Cancelled)
                    | Some(TransactionStatus::Rejected)
            );
            prop_assert_eq!(counted, !excluded);
        }
    }
}
