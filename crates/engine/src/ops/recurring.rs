use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, RecurringTransaction, RecurringTransactionCmd, ResultEngine, User, Wallet,
    recurring, users,
    util::{validate_interval, validate_transfer_shape},
};

use super::{Engine, with_tx};

impl Engine {
    /// Store a new recurring transaction template.
    ///
    /// The template is checked like a transfer executed right now (sender
    /// status, wallet, balance, card ownership, recipient wallet). The
    /// balance is checked again at every execution.
    pub async fn create_recurring_transaction(
        &self,
        cmd: RecurringTransactionCmd,
    ) -> ResultEngine<RecurringTransaction> {
        with_tx!(self, |db_tx| {
            self.create_recurring_transaction_in(&db_tx, &cmd).await
        })
    }

    pub async fn create_recurring_transaction_in(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &RecurringTransactionCmd,
    ) -> ResultEngine<RecurringTransaction> {
        validate_transfer_shape(cmd.sender_id, cmd.recipient_id, cmd.amount_minor)?;
        validate_interval(cmd.interval)?;

        let sender = self.require_sender(db_tx, cmd.sender_id).await?;
        let sender_wallet = Wallet::from(
            self.require_wallet_of(db_tx, sender.id, "sender wallet")
                .await?,
        );
        if !sender_wallet.covers(cmd.amount_minor) {
            return Err(EngineError::InsufficientFunds(format!(
                "balance {} is below {}",
                sender_wallet.balance, cmd.amount_minor
            )));
        }
        self.require_card_of(db_tx, cmd.card_id, sender.id).await?;
        self.require_wallet_of(db_tx, cmd.recipient_id, "recipient wallet")
            .await?;

        let template = RecurringTransaction {
            id: Uuid::new_v4(),
            user_id: sender.id,
            card_id: cmd.card_id,
            recipient_id: cmd.recipient_id,
            category_id: cmd.category_id,
            amount_minor: cmd.amount_minor,
            interval: cmd.interval,
            interval_type: cmd.interval_type,
            next_execution_date: cmd.next_execution_date,
            created_at: Utc::now(),
        };
        recurring::ActiveModel::from(&template).insert(db_tx).await?;
        Ok(template)
    }

    /// Return a single recurring transaction template.
    pub async fn recurring_transaction(&self, id: Uuid) -> ResultEngine<RecurringTransaction> {
        let model = recurring::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or_else(|| {
                EngineError::KeyNotFound("recurring transaction not exists".to_string())
            })?;
        RecurringTransaction::try_from(model)
    }

    /// Templates sent by `user_id`, next execution first.
    pub async fn list_recurring_transactions(
        &self,
        user_id: Uuid,
    ) -> ResultEngine<Vec<RecurringTransaction>> {
        self.require_user(&self.database, user_id, "user").await?;
        let models = recurring::Entity::find()
            .filter(recurring::Column::UserId.eq(user_id))
            .order_by_asc(recurring::Column::NextExecutionDate)
            .all(&self.database)
            .await?;
        models
            .into_iter()
            .map(RecurringTransaction::try_from)
            .collect()
    }

    /// Templates with `next_execution_date <= now`, oldest first.
    pub async fn list_due_recurring_transactions(
        &self,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<RecurringTransaction>> {
        let models = recurring::Entity::find()
            .filter(recurring::Column::NextExecutionDate.lte(now))
            .order_by_asc(recurring::Column::NextExecutionDate)
            .order_by_asc(recurring::Column::Id)
            .all(&self.database)
            .await?;
        models
            .into_iter()
            .map(RecurringTransaction::try_from)
            .collect()
    }

    /// Remove a template; transactions it already produced are kept.
    ///
    /// Authorization: the template owner or an administrator.
    pub async fn delete_recurring_transaction(
        &self,
        actor_id: Uuid,
        id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let template = recurring::Entity::find_by_id(id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound("recurring transaction not exists".to_string())
                })?;
            let actor = users::Entity::find_by_id(actor_id)
                .one(&db_tx)
                .await?
                .map(User::from);
            let allowed = actor
                .is_some_and(|actor| actor.id == template.user_id || actor.is_admin);
            if allowed {
                recurring::Entity::delete_by_id(id).exec(&db_tx).await?;
                Ok(())
            } else {
                Err(EngineError::Forbidden(
                    "only the owner or an administrator can delete a recurring transaction"
                        .to_string(),
                ))
            }
        })
    }
}
