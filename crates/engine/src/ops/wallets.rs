use sea_orm::{ActiveModelTrait, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Wallet, wallets};

use super::{Engine, with_tx};

impl Engine {
    /// Open the wallet of `user_id` with an initial balance.
    ///
    /// A user owns at most one wallet.
    pub async fn open_wallet(
        &self,
        user_id: Uuid,
        opening_balance_minor: i64,
    ) -> ResultEngine<Wallet> {
        let wallet = Wallet::open(user_id, opening_balance_minor)?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id, "user").await?;
            let exists = wallets::Entity::find()
                .filter(wallets::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                Err(EngineError::ExistingKey(format!("wallet of user {user_id}")))
            } else {
                wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;
                Ok(wallet)
            }
        })
    }

    /// Return the wallet snapshot of `user_id` from DB.
    pub async fn wallet_of(&self, user_id: Uuid) -> ResultEngine<Wallet> {
        let model = self
            .require_wallet_of(&self.database, user_id, "wallet")
            .await?;
        Ok(Wallet::from(model))
    }
}
