use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use settings::Database;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "wallet_ledger={level},engine={level}",
            level = settings.app.level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db = parse_database(&settings.database).await?;
    let engine = engine::Engine::builder()
        .database(db)
        .scheduler(settings.scheduler.options())
        .build()
        .await?;

    let period = Duration::from_secs(settings.scheduler.poll_interval_secs.max(1));
    tracing::info!(
        poll_interval_secs = period.as_secs(),
        failure_policy = ?settings.scheduler.failure_policy,
        "recurring transaction worker started"
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => run_scheduler(&engine).await,
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn run_scheduler(engine: &engine::Engine) {
    match engine.process_due().await {
        Ok(report) if report.entries.is_empty() => tracing::trace!("nothing due"),
        Ok(report) => {
            for (id, err) in report.failures() {
                if err.is_retryable() {
                    tracing::info!(recurring_transaction_id = %id, "will retry on next run");
                }
            }
        }
        Err(err) => tracing::error!("scheduler run failed: {err}"),
    }
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
