use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::ResultEngine;

mod access;
mod cards;
mod recurring;
mod scheduler;
mod transfers;
mod users;
mod wallets;

pub use scheduler::{BatchReport, EntryOutcome, EntryReport, FailurePolicy, SchedulerOptions};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    tracing::warn!("rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

/// Entry point of the ledger.
///
/// Every public operation runs in exactly one unit of work. Operations
/// suffixed with `_in` take the unit of work from the caller instead, so
/// several of them can be composed atomically (see [`Engine::begin`]).
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    scheduler: SchedulerOptions,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Open a unit of work for the `_in` operations.
    ///
    /// Dropping the returned transaction without committing rolls it back.
    pub async fn begin(&self) -> ResultEngine<DatabaseTransaction> {
        Ok(self.database.begin().await?)
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        self.scheduler
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    scheduler: SchedulerOptions,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override how `process_due` reacts to per-entry failures.
    pub fn scheduler(mut self, options: SchedulerOptions) -> EngineBuilder {
        self.scheduler = options;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            scheduler: self.scheduler,
        })
    }
}
