use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, User, cards, users, wallets};

use super::Engine;

impl Engine {
    /// Wallet owned by `user_id`; `label` names its role in the error
    /// ("sender wallet", "recipient wallet", ...).
    pub(super) async fn require_wallet_of<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
        label: &str,
    ) -> ResultEngine<wallets::Model> {
        wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("{label} not exists")))
    }

    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
        label: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("{label} not exists")))
    }

    /// Load a user allowed to originate transfers.
    ///
    /// Fails with `KeyNotFound` if missing, `Forbidden` if blocked or
    /// inactive (blocked is reported first).
    pub(super) async fn require_sender<C: ConnectionTrait>(
        &self,
        db: &C,
        sender_id: Uuid,
    ) -> ResultEngine<User> {
        let sender = User::from(self.require_user(db, sender_id, "sender").await?);
        if sender.is_blocked {
            return Err(EngineError::Forbidden("sender is blocked".to_string()));
        }
        if !sender.is_active {
            return Err(EngineError::Forbidden("sender is inactive".to_string()));
        }
        Ok(sender)
    }

    /// A card that does not belong to `user_id` is reported as missing.
    pub(super) async fn require_card_of<C: ConnectionTrait>(
        &self,
        db: &C,
        card_id: Uuid,
        user_id: Uuid,
    ) -> ResultEngine<cards::Model> {
        cards::Entity::find_by_id(card_id)
            .filter(cards::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("card not exists".to_string()))
    }

    pub(super) async fn require_admin<C: ConnectionTrait>(
        &self,
        db: &C,
        actor_id: Uuid,
    ) -> ResultEngine<User> {
        let actor = users::Entity::find_by_id(actor_id).one(db).await?;
        match actor.map(User::from) {
            Some(actor) if actor.is_admin && actor.can_send() => Ok(actor),
            _ => Err(EngineError::Forbidden(
                "You are not authorized to perform this action".to_string(),
            )),
        }
    }
}
