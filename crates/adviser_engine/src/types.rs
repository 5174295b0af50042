use thiserror::Error;

use crate::StorageError;

/// Failure talking to the Telegram Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("invalid api url {0}")]
    InvalidUrl(String),
    #[error("request timed out")]
    Timeout,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("api error {code:?}: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("can't decode response: {0}")]
    Decode(String),
}

impl TelegramError {
    /// Errors that retrying will not fix: a rejected or unknown bot token.
    pub fn is_unrecoverable(&self) -> bool {
        match self {
            TelegramError::HttpStatus(status) => matches!(status, 401 | 404),
            TelegramError::Api { code, .. } => matches!(code, Some(401) | Some(404)),
            _ => false,
        }
    }
}

/// A fetch attempt failed. The consumer logs it and retries after a backoff.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("can't get updates: {0}")]
    Channel(#[from] TelegramError),
    /// For fetchers backed by something other than the Bot API. Always retried.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    pub fn is_unrecoverable(&self) -> bool {
        match self {
            FetchError::Channel(err) => err.is_unrecoverable(),
            FetchError::Unavailable(_) => false,
        }
    }
}

/// Handling a single event failed. The consumer logs it and moves on to the
/// next event of the batch.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("can't process event: unknown event kind")]
    UnknownEventKind,
    #[error("can't process message: event carries no meta")]
    MissingMeta,
    #[error("can't send reply: {0}")]
    Channel(#[from] TelegramError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The consumer loop gave up.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("unrecoverable fetch failure: {0}")]
    Fetch(#[source] FetchError),
}
