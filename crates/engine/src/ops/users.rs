use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{EngineError, NewUserCmd, ResultEngine, User, users, util::normalize_required_text};

use super::{Engine, with_tx};

impl Engine {
    /// Register a new active, unblocked user.
    pub async fn new_user(&self, cmd: NewUserCmd) -> ResultEngine<User> {
        let email = normalize_required_text(&cmd.email, "email")?.to_lowercase();
        let name = normalize_required_text(&cmd.name, "name")?;
        with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                Err(EngineError::ExistingKey(email))
            } else {
                let model = users::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    email: ActiveValue::Set(email),
                    name: ActiveValue::Set(name),
                    is_active: ActiveValue::Set(true),
                    is_blocked: ActiveValue::Set(false),
                    is_admin: ActiveValue::Set(cmd.is_admin),
                    created_at: ActiveValue::Set(Utc::now()),
                }
                .insert(&db_tx)
                .await?;
                Ok(User::from(model))
            }
        })
    }

    /// Return a user snapshot from DB.
    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        let model = self.require_user(&self.database, user_id, "user").await?;
        Ok(User::from(model))
    }

    /// Blocks or unblocks `user_id`. A blocked user cannot originate
    /// transfers, including scheduled ones.
    ///
    /// Authorization: `actor_id` must be an active administrator.
    pub async fn set_user_blocked(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        blocked: bool,
    ) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            self.update_user_flags(&db_tx, actor_id, user_id, |user| {
                user.is_blocked = ActiveValue::Set(blocked);
            })
            .await
        })
    }

    /// Marks `user_id` inactive.
    ///
    /// Authorization: `actor_id` must be an active administrator.
    pub async fn deactivate_user(&self, actor_id: Uuid, user_id: Uuid) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            self.update_user_flags(&db_tx, actor_id, user_id, |user| {
                user.is_active = ActiveValue::Set(false);
            })
            .await
        })
    }

    async fn update_user_flags(
        &self,
        db_tx: &DatabaseTransaction,
        actor_id: Uuid,
        user_id: Uuid,
        apply: impl FnOnce(&mut users::ActiveModel),
    ) -> ResultEngine<User> {
        self.require_admin(db_tx, actor_id).await?;
        let model = self.require_user(db_tx, user_id, "user").await?;
        let mut user: users::ActiveModel = model.into();
        apply(&mut user);
        let model = user.update(db_tx).await?;
        Ok(User::from(model))
    }
}
