//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::IntervalType;

/// Move `amount_minor` from the sender wallet to the recipient wallet,
/// funded by one of the sender's cards.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub sender_id: Uuid,
    pub card_id: Uuid,
    pub recipient_id: Uuid,
    pub amount_minor: i64,
    pub category_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    pub recurring_transaction_id: Option<Uuid>,
    pub idempotency_key: Option<String>,
}

impl TransferCmd {
    #[must_use]
    pub fn new(
        sender_id: Uuid,
        card_id: Uuid,
        recipient_id: Uuid,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sender_id,
            card_id,
            recipient_id,
            amount_minor,
            category_id: None,
            occurred_at,
            recurring_transaction_id: None,
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn maybe_category_id(mut self, category_id: Option<Uuid>) -> Self {
        self.category_id = category_id;
        self
    }

    #[must_use]
    pub fn recurring_transaction_id(mut self, id: Uuid) -> Self {
        self.recurring_transaction_id = Some(id);
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Create a recurring transaction template.
#[derive(Clone, Debug)]
pub struct RecurringTransactionCmd {
    pub sender_id: Uuid,
    pub card_id: Uuid,
    pub recipient_id: Uuid,
    pub amount_minor: i64,
    pub category_id: Option<Uuid>,
    pub interval: u32,
    pub interval_type: IntervalType,
    pub next_execution_date: DateTime<Utc>,
}

impl RecurringTransactionCmd {
    /// Template executed every single `interval_type` unit, starting at
    /// `next_execution_date`.
    #[must_use]
    pub fn new(
        sender_id: Uuid,
        card_id: Uuid,
        recipient_id: Uuid,
        amount_minor: i64,
        interval_type: IntervalType,
        next_execution_date: DateTime<Utc>,
    ) -> Self {
        Self {
            sender_id,
            card_id,
            recipient_id,
            amount_minor,
            category_id: None,
            interval: 1,
            interval_type,
            next_execution_date,
        }
    }

    #[must_use]
    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Register a new user.
#[derive(Clone, Debug)]
pub struct NewUserCmd {
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

impl NewUserCmd {
    #[must_use]
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            is_admin: false,
        }
    }

    #[must_use]
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Register a payment card for a user.
#[derive(Clone, Debug)]
pub struct NewCardCmd {
    pub user_id: Uuid,
    pub number: String,
    pub card_holder: String,
    pub exp_date: NaiveDate,
    pub design: Option<String>,
}

impl NewCardCmd {
    #[must_use]
    pub fn new(
        user_id: Uuid,
        number: impl Into<String>,
        card_holder: impl Into<String>,
        exp_date: NaiveDate,
    ) -> Self {
        Self {
            user_id,
            number: number.into(),
            card_holder: card_holder.into(),
            exp_date,
            design: None,
        }
    }

    #[must_use]
    pub fn design(mut self, design: impl Into<String>) -> Self {
        self.design = Some(design.into());
        self
    }
}
