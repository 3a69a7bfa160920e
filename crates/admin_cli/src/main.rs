use std::error::Error;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{
    Amount, Engine, EntryOutcome, FailurePolicy, IntervalType, NewCardCmd, NewUserCmd,
    RecurringTransactionCmd, SchedulerOptions, TransferCmd,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "wallet_ledger_admin")]
#[command(about = "Admin utilities for the wallet ledger (users, wallets, transfers, schedules)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./wallet_ledger.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Wallet(Wallet),
    Card(Card),
    /// Move money between two wallets now.
    Transfer(TransferArgs),
    /// Transactions sent or received by a user.
    History(UserArg),
    Recurring(Recurring),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    Show(UserArg),
    Block(AdminActionArgs),
    Unblock(AdminActionArgs),
    Deactivate(AdminActionArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    admin: bool,
}

#[derive(Args, Debug)]
struct UserArg {
    #[arg(long)]
    user: Uuid,
}

#[derive(Args, Debug)]
struct AdminActionArgs {
    /// Administrator performing the action.
    #[arg(long)]
    actor: Uuid,
    #[arg(long)]
    user: Uuid,
}

#[derive(Args, Debug)]
struct Wallet {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    Open(WalletOpenArgs),
    Show(UserArg),
}

#[derive(Args, Debug)]
struct WalletOpenArgs {
    #[arg(long)]
    user: Uuid,
    /// Opening balance, e.g. `120.50`.
    #[arg(long, default_value = "0")]
    balance: Amount,
}

#[derive(Args, Debug)]
struct Card {
    #[command(subcommand)]
    command: CardCommand,
}

#[derive(Subcommand, Debug)]
enum CardCommand {
    Add(CardAddArgs),
    List(UserArg),
}

#[derive(Args, Debug)]
struct CardAddArgs {
    #[arg(long)]
    user: Uuid,
    #[arg(long)]
    number: String,
    #[arg(long)]
    holder: String,
    /// Expiration date, `YYYY-MM-DD`.
    #[arg(long)]
    exp: NaiveDate,
    #[arg(long)]
    design: Option<String>,
}

#[derive(Args, Debug)]
struct TransferArgs {
    #[arg(long)]
    sender: Uuid,
    #[arg(long)]
    card: Uuid,
    #[arg(long)]
    recipient: Uuid,
    #[arg(long)]
    amount: Amount,
    #[arg(long)]
    category: Option<Uuid>,
    #[arg(long)]
    idempotency_key: Option<String>,
}

#[derive(Args, Debug)]
struct Recurring {
    #[command(subcommand)]
    command: RecurringCommand,
}

#[derive(Subcommand, Debug)]
enum RecurringCommand {
    Create(RecurringCreateArgs),
    List(UserArg),
    Delete(RecurringDeleteArgs),
    /// Run every template due at `--at` (default: now).
    Process(RecurringProcessArgs),
}

#[derive(Args, Debug)]
struct RecurringCreateArgs {
    #[arg(long)]
    sender: Uuid,
    #[arg(long)]
    card: Uuid,
    #[arg(long)]
    recipient: Uuid,
    #[arg(long)]
    amount: Amount,
    /// `daily`, `weekly` or `monthly`.
    #[arg(long, value_parser = parse_interval_type)]
    every: IntervalType,
    #[arg(long, default_value_t = 1)]
    interval: u32,
    /// First execution, RFC 3339 (`2024-01-31T09:00:00Z`).
    #[arg(long)]
    start: DateTime<Utc>,
    #[arg(long)]
    category: Option<Uuid>,
}

#[derive(Args, Debug)]
struct RecurringDeleteArgs {
    #[arg(long)]
    actor: Uuid,
    #[arg(long)]
    id: Uuid,
}

#[derive(Args, Debug)]
struct RecurringProcessArgs {
    #[arg(long)]
    at: Option<DateTime<Utc>>,
    /// Stop at the first failing template.
    #[arg(long)]
    abort: bool,
    #[arg(long, default_value_t = 1)]
    max_concurrency: usize,
}

fn parse_interval_type(raw: &str) -> Result<IntervalType, String> {
    IntervalType::try_from(raw.to_ascii_lowercase().as_str()).map_err(|err| err.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let mut builder = Engine::builder().database(db);

    if let Command::Recurring(Recurring {
        command: RecurringCommand::Process(args),
    }) = &cli.command
    {
        builder = builder.scheduler(SchedulerOptions {
            failure_policy: if args.abort {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Continue
            },
            max_concurrency: args.max_concurrency.max(1),
        });
    }
    let engine = builder.build().await?;

    match cli.command {
        Command::User(User { command }) => match command {
            UserCommand::Create(args) => {
                let mut cmd = NewUserCmd::new(args.email, args.name);
                if args.admin {
                    cmd = cmd.admin();
                }
                print_json(&engine.new_user(cmd).await?)?;
            }
            UserCommand::Show(args) => print_json(&engine.user(args.user).await?)?,
            UserCommand::Block(args) => {
                print_json(&engine.set_user_blocked(args.actor, args.user, true).await?)?;
            }
            UserCommand::Unblock(args) => {
                print_json(&engine.set_user_blocked(args.actor, args.user, false).await?)?;
            }
            UserCommand::Deactivate(args) => {
                print_json(&engine.deactivate_user(args.actor, args.user).await?)?;
            }
        },
        Command::Wallet(Wallet { command }) => match command {
            WalletCommand::Open(args) => {
                print_json(&engine.open_wallet(args.user, args.balance.minor()).await?)?;
            }
            WalletCommand::Show(args) => {
                let wallet = engine.wallet_of(args.user).await?;
                println!(
                    "{} {}",
                    wallet.id,
                    Amount::from_minor(wallet.balance)?
                );
            }
        },
        Command::Card(Card { command }) => match command {
            CardCommand::Add(args) => {
                let mut cmd = NewCardCmd::new(args.user, args.number, args.holder, args.exp);
                if let Some(design) = args.design {
                    cmd = cmd.design(design);
                }
                print_json(&engine.new_card(cmd).await?)?;
            }
            CardCommand::List(args) => print_json(&engine.cards_of(args.user).await?)?,
        },
        Command::Transfer(args) => {
            let mut cmd = TransferCmd::new(
                args.sender,
                args.card,
                args.recipient,
                args.amount.minor(),
                Utc::now(),
            )
            .maybe_category_id(args.category);
            if let Some(key) = args.idempotency_key {
                cmd = cmd.idempotency_key(key);
            }
            print_json(&engine.execute_transfer(cmd).await?)?;
        }
        Command::History(args) => {
            print_json(&engine.list_transactions_for_user(args.user).await?)?;
        }
        Command::Recurring(Recurring { command }) => match command {
            RecurringCommand::Create(args) => {
                let mut cmd = RecurringTransactionCmd::new(
                    args.sender,
                    args.card,
                    args.recipient,
                    args.amount.minor(),
                    args.every,
                    args.start,
                )
                .interval(args.interval);
                if let Some(category) = args.category {
                    cmd = cmd.category_id(category);
                }
                print_json(&engine.create_recurring_transaction(cmd).await?)?;
            }
            RecurringCommand::List(args) => {
                print_json(&engine.list_recurring_transactions(args.user).await?)?;
            }
            RecurringCommand::Delete(args) => {
                engine
                    .delete_recurring_transaction(args.actor, args.id)
                    .await?;
                println!("deleted recurring transaction: {}", args.id);
            }
            RecurringCommand::Process(args) => {
                let report = engine
                    .process_due_at(args.at.unwrap_or_else(Utc::now))
                    .await?;
                for entry in &report.entries {
                    match &entry.outcome {
                        EntryOutcome::Executed {
                            transaction,
                            next_execution_date,
                        } => println!(
                            "{} executed: transaction {} (next {next_execution_date})",
                            entry.recurring_transaction_id, transaction.id
                        ),
                        EntryOutcome::Skipped => {
                            println!("{} skipped", entry.recurring_transaction_id);
                        }
                        EntryOutcome::Failed(err) => {
                            println!("{} failed: {err}", entry.recurring_transaction_id);
                        }
                    }
                }
                println!(
                    "executed {}, skipped {}, failed {}{}",
                    report.executed(),
                    report.skipped(),
                    report.failed(),
                    if report.aborted { " (aborted)" } else { "" }
                );
                if report.failed() > 0 {
                    std::process::exit(1);
                }
            }
        },
    }

    Ok(())
}
