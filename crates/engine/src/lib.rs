//! Wallet ledger engine.
//!
//! Users own one wallet and any number of cards. Money moves between wallets
//! through transfers, either on demand ([`Engine::execute_transfer`]) or on a
//! schedule ([`Engine::process_due`]). Amounts are integer minor units.

pub use cards::Card;
pub use commands::{NewCardCmd, NewUserCmd, RecurringTransactionCmd, TransferCmd};
pub use error::EngineError;
pub use money::Amount;
pub use ops::{
    BatchReport, Engine, EngineBuilder, EntryOutcome, EntryReport, FailurePolicy,
    SchedulerOptions,
};
pub use recurring::{IntervalType, RecurringTransaction};
pub use transactions::Transaction;
pub use users::User;
pub use wallets::Wallet;

mod cards;
mod commands;
mod error;
mod money;
mod ops;
mod recurring;
mod transactions;
mod users;
mod util;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
