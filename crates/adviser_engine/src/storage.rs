use std::sync::Arc;
use std::time::Duration;

use adviser_core::Page;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Error surfaced by every [`PageStore`] operation. Callers branch on
/// `NoSavedPages`; everything else is a `Failure`.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{context}: {source}")]
    Failure {
        context: &'static str,
        #[source]
        source: BackendError,
    },
    #[error("no saved pages")]
    NoSavedPages,
}

impl StorageError {
    pub(crate) fn failure(context: &'static str, source: impl Into<BackendError>) -> Self {
        StorageError::Failure {
            context,
            source: source.into(),
        }
    }

    pub fn is_no_saved_pages(&self) -> bool {
        matches!(self, StorageError::NoSavedPages)
    }
}

/// Underlying cause of a [`StorageError::Failure`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("storage worker failed: {0}")]
    Worker(String),
    #[error("database schema version {found} is newer than supported {supported}")]
    SchemaVersion { found: u32, supported: u32 },
}

/// Durable set of saved pages keyed by the literal `(url, owner)` pair.
///
/// `save` does not deduplicate; callers that want one record per pair check
/// `is_exists` first. Two concurrent savers of the same pair can still both
/// insert.
#[async_trait::async_trait]
pub trait PageStore: Send + Sync {
    async fn save(&self, page: &Page) -> StorageResult<()>;

    /// One of `owner`'s pages, chosen uniformly at random.
    /// Fails with [`StorageError::NoSavedPages`] when `owner` has none.
    async fn pick_random(&self, owner: &str) -> StorageResult<Page>;

    /// Deletes every record matching the pair. Deleting nothing is not an error.
    async fn remove(&self, page: &Page) -> StorageResult<()>;

    async fn is_exists(&self, page: &Page) -> StorageResult<bool>;
}

#[async_trait::async_trait]
impl<T> PageStore for Arc<T>
where
    T: PageStore + ?Sized,
{
    async fn save(&self, page: &Page) -> StorageResult<()> {
        (**self).save(page).await
    }

    async fn pick_random(&self, owner: &str) -> StorageResult<Page> {
        (**self).pick_random(owner).await
    }

    async fn remove(&self, page: &Page) -> StorageResult<()> {
        (**self).remove(page).await
    }

    async fn is_exists(&self, page: &Page) -> StorageResult<bool> {
        (**self).is_exists(page).await
    }
}
