//! Transaction primitives.
//!
//! A `Transaction` is the immutable record of a completed transfer from the
//! sender wallet to the recipient wallet. It is written once, in the same
//! unit of work that moves the money, and never updated.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub card_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    /// Template that produced this transaction, if any.
    pub recurring_transaction_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
}

impl Transaction {
    pub fn new(
        sender_id: Uuid,
        recipient_id: Uuid,
        card_id: Uuid,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            sender_id,
            recipient_id,
            card_id,
            category_id: None,
            amount_minor,
            occurred_at,
            recurring_transaction_id: None,
            idempotency_key: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub card_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    pub occurred_at: DateTimeUtc,
    pub recurring_transaction_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            sender_id: ActiveValue::Set(tx.sender_id),
            recipient_id: ActiveValue::Set(tx.recipient_id),
            card_id: ActiveValue::Set(tx.card_id),
            category_id: ActiveValue::Set(tx.category_id),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            recurring_transaction_id: ActiveValue::Set(tx.recurring_transaction_id),
            idempotency_key: ActiveValue::Set(tx.idempotency_key.clone()),
        }
    }
}

impl From<Model> for Transaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            sender_id: model.sender_id,
            recipient_id: model.recipient_id,
            card_id: model.card_id,
            category_id: model.category_id,
            amount_minor: model.amount_minor,
            occurred_at: model.occurred_at,
            recurring_transaction_id: model.recurring_transaction_id,
            idempotency_key: model.idempotency_key,
        }
    }
}
