//! Read adviser engine: event consumption loop, page storage and the Telegram
//! channel.
mod consumer;
mod events;
mod processor;
mod sqlite;
mod storage;
mod telegram;
mod types;

pub use consumer::{ConsumerSettings, EventConsumer};
pub use events::{Fetcher, Processor};
pub use processor::{TelegramMeta, TelegramProcessor};
pub use sqlite::{SqliteStorage, StoreSettings};
pub use storage::{BackendError, PageStore, StorageError, StorageResult};
pub use telegram::{Chat, ClientSettings, IncomingMessage, TelegramClient, Update, User};
pub use types::{ConsumerError, FetchError, ProcessError, TelegramError};
