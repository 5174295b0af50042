use std::sync::atomic::{AtomicI64, Ordering};

use adviser_core::{Command, Event, EventKind, Page, Reply};
use adviser_logging::{adviser_debug, adviser_info};

use crate::telegram::Update;
use crate::{FetchError, Fetcher, PageStore, ProcessError, Processor, StorageError, TelegramClient};

/// Where a Telegram message came from; needed to answer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramMeta {
    pub chat_id: i64,
    /// Owner identity under which pages are stored.
    pub username: String,
}

/// Turns Telegram updates into events and handles bot commands against a
/// [`PageStore`]. Serves as both the [`Fetcher`] and the [`Processor`] of a
/// consumer; share it through an `Arc`.
pub struct TelegramProcessor<S> {
    client: TelegramClient,
    store: S,
    offset: AtomicI64,
}

impl<S: PageStore> TelegramProcessor<S> {
    pub fn new(client: TelegramClient, store: S) -> Self {
        Self {
            client,
            store,
            offset: AtomicI64::new(0),
        }
    }

    /// Id of the next update to ask Telegram for.
    pub fn offset(&self) -> i64 {
        self.offset.load(Ordering::Acquire)
    }

    async fn handle_message(&self, text: &str, meta: &TelegramMeta) -> Result<(), ProcessError> {
        let command = Command::parse(text);
        adviser_info!("got {} from '{}'", command_name(&command), meta.username);

        let reply = match command {
            Command::Save(url) => self.save_page(Page::new(url, meta.username.as_str())).await?,
            Command::Random => return self.send_random(meta).await,
            Command::Start => Reply::Hello,
            Command::Help => Reply::Help,
            Command::Unknown(_) => Reply::UnknownCommand,
        };
        self.reply(meta.chat_id, &reply).await
    }

    async fn save_page(&self, page: Page) -> Result<Reply, ProcessError> {
        if self.store.is_exists(&page).await? {
            return Ok(Reply::AlreadyExists);
        }
        self.store.save(&page).await?;
        adviser_debug!("saved {}", page);
        Ok(Reply::Saved)
    }

    async fn send_random(&self, meta: &TelegramMeta) -> Result<(), ProcessError> {
        let page = match self.store.pick_random(&meta.username).await {
            Ok(page) => page,
            Err(StorageError::NoSavedPages) => {
                adviser_info!("nothing saved for '{}'", meta.username);
                return self.reply(meta.chat_id, &Reply::NoSavedPages).await;
            }
            Err(err) => return Err(err.into()),
        };

        self.reply(meta.chat_id, &Reply::Page(page.url.clone())).await?;
        // Handed out means read.
        self.store.remove(&page).await?;
        Ok(())
    }

    async fn reply(&self, chat_id: i64, reply: &Reply) -> Result<(), ProcessError> {
        self.client.send_message(chat_id, &reply.text()).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: PageStore> Fetcher for TelegramProcessor<S> {
    type Meta = TelegramMeta;

    async fn fetch(&self, limit: usize) -> Result<Vec<Event<TelegramMeta>>, FetchError> {
        let updates = self.client.updates(self.offset(), limit).await?;
        let Some(last) = updates.last() else {
            return Ok(Vec::new());
        };
        // Telegram confirms everything below the offset on the next call.
        self.offset.store(last.update_id + 1, Ordering::Release);

        Ok(updates.into_iter().map(to_event).collect())
    }
}

#[async_trait::async_trait]
impl<S: PageStore> Processor<TelegramMeta> for TelegramProcessor<S> {
    async fn process(&self, event: Event<TelegramMeta>) -> Result<(), ProcessError> {
        match event.kind {
            EventKind::Message => {
                let meta = event.meta.ok_or(ProcessError::MissingMeta)?;
                self.handle_message(&event.text, &meta).await
            }
            _ => Err(ProcessError::UnknownEventKind),
        }
    }
}

fn to_event(update: Update) -> Event<TelegramMeta> {
    let Some(message) = update.message else {
        return Event::unknown();
    };
    let Some(text) = message.text else {
        return Event::unknown();
    };
    // Users without a public username still need a stable identity.
    let username = match message.from {
        Some(user) => user.username.unwrap_or_else(|| format!("id:{}", user.id)),
        None => format!("chat:{}", message.chat.id),
    };
    Event::message(
        text,
        TelegramMeta {
            chat_id: message.chat.id,
            username,
        },
    )
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Start => "/start",
        Command::Help => "/help",
        Command::Random => "/rnd",
        Command::Save(_) => "save",
        Command::Unknown(_) => "unknown command",
    }
}
