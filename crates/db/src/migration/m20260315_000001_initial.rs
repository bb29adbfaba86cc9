//! Initial migration: wallets and transactions.
//!
//! The whole ledger persists in exactly two tables related by foreign key.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS wallets CASCADE;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS transaction_type;
DROP TYPE IF EXISTS wallet_kind;
",
        )
        .await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
-- Closed enumerations for wallet and transaction classification
CREATE TYPE wallet_kind AS ENUM ('general', 'profit', 'provider_cost', 'tax', 'fee');
CREATE TYPE transaction_type AS ENUM ('credit', 'debit', 'refund');
CREATE TYPE transaction_status AS ENUM (
    'completed', 'pending', 'pending_refund', 'refunded',
    'failed', 'cancelled', 'rejected'
);

-- Wallets: one accounting bucket per (owner, kind)
CREATE TABLE wallets (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    owner_id UUID NOT NULL,
    kind wallet_kind NOT NULL,
    currency VARCHAR(3) NOT NULL,
    balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_wallets_owner_kind UNIQUE (owner_id, kind)
);

-- Index for listing an owner's wallets
CREATE INDEX idx_wallets_owner ON wallets(owner_id);

-- Transactions: append-only ledger entries
-- status is nullable: legacy rows carry no status and count toward balances
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    wallet_id UUID NOT NULL REFERENCES wallets(id) ON DELETE CASCADE,
    amount NUMERIC(19, 2) NOT NULL,
    entry_type transaction_type NOT NULL,
    status transaction_status,
    description TEXT NOT NULL,
    order_id UUID,
    plan_id UUID,
    related_transaction_id UUID REFERENCES transactions(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_nonzero CHECK (amount <> 0)
);

-- Index for balance derivation and wallet history listing
CREATE INDEX idx_transactions_wallet ON transactions(wallet_id, created_at DESC);

-- Index for refund lookup by order correlation
CREATE INDEX idx_transactions_order ON transactions(order_id) WHERE order_id IS NOT NULL;

-- Index for walking mirrored-entry trees
CREATE INDEX idx_transactions_related ON transactions(related_transaction_id)
    WHERE related_transaction_id IS NOT NULL;
";
