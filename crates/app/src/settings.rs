//! Handles settings for the application. Configuration is read from
//! `settings.toml` (optional) and overridden by `WALLET_LEDGER__*`
//! environment variables, e.g. `WALLET_LEDGER__SCHEDULER__POLL_INTERVAL_SECS=5`.
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use engine::{FailurePolicy, SchedulerOptions};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("wallet_ledger.db".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Scheduler {
    pub fn options(&self) -> SchedulerOptions {
        SchedulerOptions {
            failure_policy: self.failure_policy,
            max_concurrency: self.max_concurrency.max(1),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            failure_policy: FailurePolicy::default(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub scheduler: Scheduler,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(Environment::with_prefix("WALLET_LEDGER").separator("__")),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_concurrency() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
            .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let settings = parse("");
        assert_eq!(settings.app.level, "info");
        assert_eq!(
            settings.database,
            Database::Sqlite("wallet_ledger.db".to_string())
        );
        assert_eq!(settings.scheduler.poll_interval_secs, 60);
        assert_eq!(settings.scheduler.options(), SchedulerOptions::default());
    }

    #[test]
    fn full_file_is_parsed() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [database]
            sqlite = "/var/lib/ledger.db"

            [scheduler]
            poll_interval_secs = 5
            failure_policy = "abort"
            max_concurrency = 4
            "#,
        );
        assert_eq!(settings.app.level, "debug");
        assert_eq!(
            settings.database,
            Database::Sqlite("/var/lib/ledger.db".to_string())
        );
        assert_eq!(settings.scheduler.poll_interval_secs, 5);
        assert_eq!(
            settings.scheduler.options(),
            SchedulerOptions {
                failure_policy: FailurePolicy::Abort,
                max_concurrency: 4,
            }
        );
    }

    #[test]
    fn memory_database_and_zero_concurrency() {
        let settings = parse(
            r#"
            database = "memory"

            [scheduler]
            max_concurrency = 0
            "#,
        );
        assert_eq!(settings.database, Database::Memory);
        assert_eq!(settings.scheduler.options().max_concurrency, 1);
    }
}
