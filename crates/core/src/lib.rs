//! Core ledger logic for Centime.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and propagation planning live here.
//!
//! # Modules
//!
//! - `wallet` - Wallet kinds and provisioning rules
//! - `ledger` - Transaction taxonomy, balance inclusion policy, errors
//! - `propagation` - Entry-set planning for purchases, refunds, and adjustments

pub mod ledger;
pub mod propagation;
pub mod wallet;
