//! Entry-set planning for multi-wallet propagation.
//!
//! A business event (purchase, refund, adjustment) never writes the ledger
//! directly. It is first planned here as an ordered set of entries against
//! wallet ROLES, with parent links forming an audit tree, and validated for
//! money conservation. The database orchestrator then resolves roles to
//! wallet rows and executes the plan inside one transaction.

pub mod plan;
pub mod purchase;
pub mod refund;

#[cfg(test)]
mod plan_props;

pub use plan::{PlannedEntry, PropagationPlan, WalletRole};
pub use purchase::{plan_purchase, PurchaseAmounts};
pub use refund::{estimate_split, plan_refund, CostSplit};
