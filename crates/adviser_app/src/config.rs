use clap::Parser;
use thiserror::Error;

use crate::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(name = "read-adviser", about = "Telegram bot that keeps a reading list of links")]
pub struct Cli {
    /// Token for access to the Telegram bot
    #[arg(long, env = "TG_BOT_TOKEN", hide_env_values = true)]
    pub tg_bot_token: Option<String>,

    /// SQLite database path, `file:` URI or `:memory:`
    #[arg(long, env = "DB_CONNECTION_STRING")]
    pub db_connection_string: Option<String>,

    /// Maximum number of updates fetched per poll
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    pub log_destination: LogDestination,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("token is not specified")]
    MissingToken,
    #[error("db connection string is not specified")]
    MissingConnectionString,
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
}

/// Validated settings the bot starts with.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tg_bot_token: String,
    pub db_connection_string: String,
    pub batch_size: usize,
    pub log_destination: LogDestination,
    pub verbose: bool,
}

impl Cli {
    pub fn validate(self) -> Result<AppConfig, ConfigError> {
        let tg_bot_token = non_empty(self.tg_bot_token).ok_or(ConfigError::MissingToken)?;
        let db_connection_string =
            non_empty(self.db_connection_string).ok_or(ConfigError::MissingConnectionString)?;
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        Ok(AppConfig {
            tg_bot_token,
            db_connection_string,
            batch_size: self.batch_size,
            log_destination: self.log_destination,
            verbose: self.verbose,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
