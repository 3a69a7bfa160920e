use sea_orm::{
    Condition, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Transaction, TransferCmd, Wallet, transactions,
    util::{normalize_optional_text, validate_transfer_shape},
    wallets,
};

use super::{Engine, with_tx};

impl Engine {
    /// Moves money from the sender wallet to the recipient wallet in its own
    /// unit of work.
    ///
    /// See [`Engine::execute_transfer_in`] for the checks performed.
    pub async fn execute_transfer(&self, cmd: TransferCmd) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| self.execute_transfer_in(&db_tx, &cmd).await)
    }

    /// Moves money inside the caller's unit of work.
    ///
    /// Preconditions, checked in order, each failing fast:
    /// 1. sender exists (`KeyNotFound`);
    /// 2. sender is neither blocked nor inactive (`Forbidden`);
    /// 3. sender wallet exists (`KeyNotFound`);
    /// 4. sender balance covers the amount (`InsufficientFunds`);
    /// 5. card exists and belongs to the sender (`KeyNotFound`);
    /// 6. recipient wallet exists (`KeyNotFound`).
    ///
    /// Nothing is written until all checks pass. The debit is re-checked by
    /// the `UPDATE` itself, so a concurrent transfer that drained the wallet
    /// after step 4 still yields `InsufficientFunds`. A credit that would
    /// overflow the recipient balance fails with `InvalidAmount`.
    ///
    /// A command carrying an idempotency key already used by the same sender
    /// returns the recorded transaction and moves no money.
    pub async fn execute_transfer_in(
        &self,
        db_tx: &DatabaseTransaction,
        cmd: &TransferCmd,
    ) -> ResultEngine<Transaction> {
        validate_transfer_shape(cmd.sender_id, cmd.recipient_id, cmd.amount_minor)?;
        let idempotency_key = normalize_optional_text(cmd.idempotency_key.as_deref());

        if let Some(key) = idempotency_key.as_deref()
            && let Some(existing) = self
                .find_by_idempotency_key(db_tx, cmd.sender_id, key)
                .await?
        {
            tracing::debug!(transaction_id = %existing.id, "idempotent transfer replay");
            return Ok(existing);
        }

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
        let recipient_wallet = self
            .require_wallet_of(db_tx, cmd.recipient_id, "recipient wallet")
            .await?;

        self.debit_wallet(db_tx, sender_wallet.id, cmd.amount_minor)
            .await?;
        self.credit_wallet(db_tx, recipient_wallet.id, cmd.amount_minor)
            .await?;

        let mut tx = Transaction::new(
            sender.id,
            cmd.recipient_id,
            cmd.card_id,
            cmd.amount_minor,
            cmd.occurred_at,
        )?;
        tx.category_id = cmd.category_id;
        tx.recurring_transaction_id = cmd.recurring_transaction_id;
        tx.idempotency_key = idempotency_key;
        transactions::ActiveModel::from(&tx).insert(db_tx).await?;

        tracing::debug!(
            transaction_id = %tx.id,
            sender_id = %tx.sender_id,
            recipient_id = %tx.recipient_id,
            amount_minor = tx.amount_minor,
            "transfer recorded"
        );
        Ok(tx)
    }

    /// Return a single transaction.
    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<Transaction> {
        transactions::Entity::find_by_id(transaction_id)
            .one(&self.database)
            .await?
            .map(Transaction::from)
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    /// Transactions sent or received by `user_id`, newest first.
    pub async fn list_transactions_for_user(
        &self,
        user_id: Uuid,
    ) -> ResultEngine<Vec<Transaction>> {
        self.require_user(&self.database, user_id, "user").await?;
        let models = transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(transactions::Column::SenderId.eq(user_id))
                    .add(transactions::Column::RecipientId.eq(user_id)),
            )
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Transaction::from).collect())
    }

    async fn find_by_idempotency_key<C: ConnectionTrait>(
        &self,
        db: &C,
        sender_id: Uuid,
        key: &str,
    ) -> ResultEngine<Option<Transaction>> {
        let existing = transactions::Entity::find()
            .filter(transactions::Column::SenderId.eq(sender_id))
            .filter(transactions::Column::IdempotencyKey.eq(key.to_string()))
            .one(db)
            .await?;
        Ok(existing.map(Transaction::from))
    }

    /// `balance = balance - amount` guarded by `balance >= amount`.
    async fn debit_wallet(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<()> {
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).sub(amount_minor),
            )
            .filter(wallets::Column::Id.eq(wallet_id))
            .filter(wallets::Column::Balance.gte(amount_minor))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::InsufficientFunds(
                "balance changed concurrently".to_string(),
            ));
        }
        Ok(())
    }

    /// `balance = balance + amount` guarded against `i64` overflow.
    async fn credit_wallet(
        &self,
        db_tx: &DatabaseTransaction,
        wallet_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<()> {
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).add(amount_minor),
            )
            .filter(wallets::Column::Id.eq(wallet_id))
            .filter(wallets::Column::Balance.lte(i64::MAX - amount_minor))
            .exec(db_tx)
            .await?;
        if result.rows_affected != 1 {
            return Err(EngineError::InvalidAmount(
                "recipient balance would overflow".to_string(),
            ));
        }
        Ok(())
    }
}
