//! Wallet kinds and provisioning rules.
//!
//! Every owner holds at most one wallet per kind. Ordinary owners carry only
//! a `general` wallet; the platform operator carries the full hierarchy that
//! purchase and refund propagation fans out across.

use serde::{Deserialize, Serialize};

/// The kind of an accounting wallet.
///
/// The (owner, kind) pair is unique: an owner never holds two wallets of the
/// same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    /// Primary spending/receiving wallet. Every owner has one.
    General,
    /// Platform margin on sales (retail minus wholesale cost).
    Profit,
    /// Wholesale amounts owed to upstream providers.
    ProviderCost,
    /// Collected jurisdiction taxes.
    Tax,
    /// Collected processing fees.
    Fee,
}

/// All wallet kinds provisioned for the platform operator.
pub const PLATFORM_KINDS: [WalletKind; 5] = [
    WalletKind::General,
    WalletKind::Profit,
    WalletKind::ProviderCost,
    WalletKind::Tax,
    WalletKind::Fee,
];

/// Wallet kinds provisioned for an ordinary owner.
pub const CLIENT_KINDS: [WalletKind; 1] = [WalletKind::General];

/// Returns the wallet kinds an owner must be provisioned with.
///
/// The platform operator gets the full hierarchy at creation time; ordinary
/// owners get only `general`.
#[must_use]
pub fn kinds_for_owner(is_platform: bool) -> &'static [WalletKind] {
    if is_platform {
        &PLATFORM_KINDS
    } else {
        &CLIENT_KINDS
    }
}

impl WalletKind {
    /// Returns the canonical string form stored in the database enum.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Profit => "profit",
            Self::ProviderCost => "provider_cost",
            Self::Tax => "tax",
            Self::Fee => "fee",
        }
    }
}

impl std::fmt::Display for WalletKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WalletKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "profit" => Ok(Self::Profit),
            "provider_cost" => Ok(Self::ProviderCost),
            "tax" => Ok(Self::Tax),
            "fee" => Ok(Self::Fee),
            _ => Err(format!("Unknown wallet kind: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[test]
    fn test_platform_gets_full_hierarchy() {
        let kinds = kinds_for_owner(true);
        assert_eq!(kinds.len(), 5);
        assert!(kinds.contains(&WalletKind::General));
        assert!(kinds.contains(&WalletKind::Profit));
        assert!(kinds.contains(&WalletKind::ProviderCost));
        assert!(kinds.contains(&WalletKind::Tax));
        assert!(kinds.contains(&WalletKind::Fee));
    }

    #[test]
    fn test_ordinary_owner_gets_general_only() {
        assert_eq!(kinds_for_owner(false), &[WalletKind::General]);
    }

    #[test]
    fn test_platform_kinds_unique() {
        let mut kinds: Vec<&str> = PLATFORM_KINDS.iter().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), PLATFORM_KINDS.len());
    }

    #[rstest]
    #[case(WalletKind::General, "general")]
    #[case(WalletKind::Profit, "profit")]
    #[case(WalletKind::ProviderCost, "provider_cost")]
    #[case(WalletKind::Tax, "tax")]
    #[case(WalletKind::Fee, "fee")]
    fn test_kind_string_roundtrip(#[case] kind: WalletKind, #[case] s: &str) {
        assert_eq!(kind.as_str(), s);
        assert_eq!(WalletKind::from_str(s).unwrap(), kind);
    }

    #[test]
    fn test_kind_from_str_unknown() {
        assert!(WalletKind::from_str("escrow").is_err());
        assert!(WalletKind::from_str("").is_err());
    }
}
