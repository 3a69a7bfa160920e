//! Recurring transaction templates and their schedule arithmetic.

use chrono::{DateTime, Months, TimeDelta, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Unit of the interval between two executions of a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalType {
    Daily,
    Weekly,
    Monthly,
}

impl IntervalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Returns the date `interval` units after `from`.
    ///
    /// Time of day is preserved. `Monthly` keeps the day-of-month and wraps
    /// December into January of the next year; when the target month is
    /// shorter, the date is clamped to its last day (Jan 31 → Feb 29 in a
    /// leap year).
    pub fn advance(self, from: DateTime<Utc>, interval: u32) -> ResultEngine<DateTime<Utc>> {
        if interval == 0 {
            return Err(EngineError::InvalidSchedule(
                "interval must be >= 1".to_string(),
            ));
        }
        let overflow = || EngineError::InvalidSchedule("next execution date out of range".to_string());
        match self {
            Self::Daily => TimeDelta::try_days(i64::from(interval))
                .and_then(|delta| from.checked_add_signed(delta))
                .ok_or_else(overflow),
            Self::Weekly => TimeDelta::try_weeks(i64::from(interval))
                .and_then(|delta| from.checked_add_signed(delta))
                .ok_or_else(overflow),
            Self::Monthly => from
                .checked_add_months(Months::new(interval))
                .ok_or_else(overflow),
        }
    }
}

impl TryFrom<&str> for IntervalType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::InvalidSchedule(format!(
                "invalid interval type: {other}"
            ))),
        }
    }
}

/// Template for a transfer repeated on a schedule until it is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: Uuid,
    /// Sender of every generated transfer.
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub recipient_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    pub interval: u32,
    pub interval_type: IntervalType,
    pub next_execution_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RecurringTransaction {
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_execution_date <= now
    }

    /// Execution date following the current `next_execution_date`.
    pub fn following_execution_date(&self) -> ResultEngine<DateTime<Utc>> {
        self.interval_type
            .advance(self.next_execution_date, self.interval)
    }

    /// Key identifying the execution scheduled at `next_execution_date`.
    ///
    /// Two workers racing on the same occurrence produce the same key, so at
    /// most one transfer is recorded for it.
    #[must_use]
    pub fn occurrence_key(&self) -> String {
        format!(
            "recurring:{}:{}",
            self.id,
            self.next_execution_date.timestamp()
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub recipient_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    pub interval: i32,
    pub interval_type: String,
    pub next_execution_date: DateTimeUtc,
    pub created_at: DateTimeUtc,
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
    Sender,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sender.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RecurringTransaction> for ActiveModel {
    fn from(value: &RecurringTransaction) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            user_id: ActiveValue::Set(value.user_id),
            card_id: ActiveValue::Set(value.card_id),
            recipient_id: ActiveValue::Set(value.recipient_id),
            category_id: ActiveValue::Set(value.category_id),
            amount_minor: ActiveValue::Set(value.amount_minor),
            interval: ActiveValue::Set(i32::try_from(value.interval).unwrap_or(i32::MAX)),
            interval_type: ActiveValue::Set(value.interval_type.as_str().to_string()),
            next_execution_date: ActiveValue::Set(value.next_execution_date),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for RecurringTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let interval = u32::try_from(model.interval)
            .ok()
            .filter(|interval| *interval > 0)
            .ok_or_else(|| {
                EngineError::InvalidSchedule(format!("invalid stored interval: {}", model.interval))
            })?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            card_id: model.card_id,
            recipient_id: model.recipient_id,
            category_id: model.category_id,
            amount_minor: model.amount_minor,
            interval,
            interval_type: IntervalType::try_from(model.interval_type.as_str())?,
            next_execution_date: model.next_execution_date,
            created_at: model.created_at,
        })
    }
}
