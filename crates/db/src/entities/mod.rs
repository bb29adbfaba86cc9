//! `SeaORM` entity definitions for the ledger tables.

pub mod sea_orm_active_enums;
pub mod transactions;
pub mod wallets;
