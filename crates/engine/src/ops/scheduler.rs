use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, RecurringTransaction, ResultEngine, Transaction, TransferCmd, recurring,
};

use super::{Engine, with_tx};

/// How a batch reacts to an entry that fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log and report the failure, keep processing the other entries.
    #[default]
    Continue,
    /// Stop the batch at the first failure.
    Abort,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerOptions {
    pub failure_policy: FailurePolicy,
    /// Entries processed at once under [`FailurePolicy::Continue`].
    pub max_concurrency: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Continue,
            max_concurrency: 1,
        }
    }
}

#[derive(Debug)]
pub enum EntryOutcome {
    Executed {
        transaction: Transaction,
        next_execution_date: DateTime<Utc>,
    },
    /// The entry vanished or is no longer due.
    Skipped,
    Failed(EngineError),
}

#[derive(Debug)]
pub struct EntryReport {
    pub recurring_transaction_id: Uuid,
    pub outcome: EntryOutcome,
}

/// Result of one scheduler run, entries in due order.
#[derive(Debug)]
pub struct BatchReport {
    pub ran_at: DateTime<Utc>,
    pub entries: Vec<EntryReport>,
    /// `true` when [`FailurePolicy::Abort`] stopped the run early.
    pub aborted: bool,
}

impl BatchReport {
    pub fn executed(&self) -> usize {
        self.count(|outcome| matches!(outcome, EntryOutcome::Executed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, EntryOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, EntryOutcome::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (Uuid, &EngineError)> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            EntryOutcome::Failed(err) => Some((entry.recurring_transaction_id, err)),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| pred(&entry.outcome))
            .count()
    }
}

impl Engine {
    /// Execute every recurring transaction due at the current time.
    pub async fn process_due(&self) -> ResultEngine<BatchReport> {
        self.process_due_at(Utc::now()).await
    }

    /// Execute every recurring transaction with `next_execution_date <= now`.
    ///
    /// Each entry runs in its own unit of work: the transfer and the schedule
    /// advance commit together or not at all. An overdue entry runs once and
    /// moves forward by a single interval.
    ///
    /// Errors are only returned when the due entries cannot be listed;
    /// per-entry failures are part of the report.
    pub async fn process_due_at(&self, now: DateTime<Utc>) -> ResultEngine<BatchReport> {
        let due: Vec<Uuid> = self
            .list_due_recurring_transactions(now)
            .await?
            .into_iter()
            .map(|entry| entry.id)
            .collect();
        tracing::debug!(due = due.len(), %now, "processing recurring transactions");

        let mut report = BatchReport {
            ran_at: now,
            entries: Vec::with_capacity(due.len()),
            aborted: false,
        };

        match self.scheduler.failure_policy {
            FailurePolicy::Continue => {
                report.entries = stream::iter(due)
                    .map(|id| self.process_recurring_transaction(id, now))
                    .buffered(self.scheduler.max_concurrency.max(1))
                    .collect()
                    .await;
            }
            FailurePolicy::Abort => {
                for id in due {
                    let entry = self.process_recurring_transaction(id, now).await;
                    let failed = matches!(entry.outcome, EntryOutcome::Failed(_));
                    report.entries.push(entry);
                    if failed {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        tracing::info!(
            executed = report.executed(),
            skipped = report.skipped(),
            failed = report.failed(),
            aborted = report.aborted,
            "recurring transactions processed"
        );
        Ok(report)
    }

    /// Run a single template as the scheduler would at `now`.
    ///
    /// A template that is missing or not due at `now` (for example because
    /// another worker already advanced it) is reported `Skipped`.
    pub async fn process_recurring_transaction(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> EntryReport {
        let outcome = match self.run_entry(id, now).await {
            Ok(outcome) => outcome,
            Err(err) => EntryOutcome::Failed(err),
        };
        match &outcome {
            EntryOutcome::Executed {
                transaction,
                next_execution_date,
            } => tracing::info!(
                recurring_transaction_id = %id,
                transaction_id = %transaction.id,
                %next_execution_date,
                "recurring transaction executed"
            ),
            EntryOutcome::Skipped => {
                tracing::debug!(recurring_transaction_id = %id, "recurring transaction skipped")
            }
            EntryOutcome::Failed(err) => tracing::warn!(
                recurring_transaction_id = %id,
                retryable = err.is_retryable(),
                "recurring transaction failed: {err}"
            ),
        }
        EntryReport {
            recurring_transaction_id: id,
            outcome,
        }
    }

    async fn run_entry(&self, id: Uuid, now: DateTime<Utc>) -> ResultEngine<EntryOutcome> {
        with_tx!(self, |db_tx| self.execute_due_entry(&db_tx, id, now).await)
    }

    async fn execute_due_entry(
        &self,
        db_tx: &DatabaseTransaction,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<EntryOutcome> {
        let Some(model) = recurring::Entity::find_by_id(id).one(db_tx).await? else {
            return Ok(EntryOutcome::Skipped);
        };
        let entry = RecurringTransaction::try_from(model)?;
        if !entry.is_due(now) {
            return Ok(EntryOutcome::Skipped);
        }

        let next_execution_date = entry.following_execution_date()?;
        let cmd = TransferCmd::new(
            entry.user_id,
            entry.card_id,
            entry.recipient_id,
            entry.amount_minor,
            now,
        )
        .maybe_category_id(entry.category_id)
        .recurring_transaction_id(entry.id)
        .idempotency_key(entry.occurrence_key());

        let transaction = self.execute_transfer_in(db_tx, &cmd).await?;
        advance_schedule(db_tx, &entry, next_execution_date).await?;

        Ok(EntryOutcome::Executed {
            transaction,
            next_execution_date,
        })
    }
}

/// Move `entry` to `next` only if nobody moved it since it was read.
async fn advance_schedule(
    db_tx: &DatabaseTransaction,
    entry: &RecurringTransaction,
    next: DateTime<Utc>,
) -> ResultEngine<()> {
    let result = recurring::Entity::update_many()
        .col_expr(
            recurring::Column::NextExecutionDate,
            Expr::value(next),
        )
        .filter(recurring::Column::Id.eq(entry.id))
        .filter(recurring::Column::NextExecutionDate.eq(entry.next_execution_date))
        .exec(db_tx)
        .await?;
    if result.rows_affected == 0 {
        return Err(EngineError::Conflict(format!(
            "recurring transaction {} was advanced concurrently",
            entry.id
        )));
    }
    Ok(())
}
