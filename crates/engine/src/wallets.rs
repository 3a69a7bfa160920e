//! The module contains `Wallet` struct and its table.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// A wallet.
///
/// Every user owns at most one wallet; its balance is the only mutable
/// financial state of the ledger and is never negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Balance in minor units.
    pub balance: i64,
}

impl Wallet {
    pub fn open(user_id: Uuid, balance: i64) -> ResultEngine<Self> {
        if balance < 0 {
            return Err(EngineError::InvalidAmount(
                "opening balance must be >= 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            balance,
        })
    }

    /// Returns `true` if the wallet can cover `amount_minor`.
    #[must_use]
    pub fn covers(&self, amount_minor: i64) -> bool {
        self.balance >= amount_minor
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub balance: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            user_id: ActiveValue::Set(value.user_id),
            balance: ActiveValue::Set(value.balance),
        }
    }
}

impl From<Model> for Wallet {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            balance: model.balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_rejects_negative_balance() {
        let err = Wallet::open(Uuid::new_v4(), -1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn covers_is_inclusive() {
        let wallet = Wallet::open(Uuid::new_v4(), 500).unwrap();
        assert!(wallet.covers(500));
        assert!(wallet.covers(1));
        assert!(!wallet.covers(501));
    }
}
