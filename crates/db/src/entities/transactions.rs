//! `SeaORM` Entity for the transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{TransactionStatus, TransactionType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub wallet_id: Uuid,
    /// Signed amount: credits positive, debits negative.
    pub amount: Decimal,
    pub entry_type: TransactionType,
    /// Nullable: legacy rows carry no status and count toward balances.
    pub status: Option<TransactionStatus>,
    pub description: String,
    pub order_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    /// Links a mirrored/derived entry to the entry that caused it.
    pub related_transaction_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id"
    )]
    Wallets,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::RelatedTransactionId",
        to = "Column::Id"
    )]
    SelfRef,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
