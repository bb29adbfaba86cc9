//! Transaction taxonomy and balance derivation rules.
//!
//! This module defines:
//! - Entry types and transaction statuses as closed enumerations
//! - The balance inclusion policy (which statuses count toward a balance)
//! - Balance derivation over in-memory entries
//! - Error types for ledger operations

pub mod error;
pub mod policy;
pub mod types;

pub use error::LedgerError;
pub use policy::{counts_toward_balance, derive_balance, COUNTED_STATUSES};
pub use types::{EntryType, TransactionStatus};
