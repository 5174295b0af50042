//! SQLite-backed page store.
//!
//! The connection is opened once and shared. Every statement runs on the
//! blocking pool under a deadline; a statement that misses its deadline is
//! reported as failed but may still complete in the background.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use adviser_core::Page;
use adviser_logging::{adviser_debug, adviser_error, adviser_info};
use rusqlite::{params, Connection, OptionalExtension};

use crate::{BackendError, PageStore, StorageError, StorageResult};

/// Schema steps, applied in order. `PRAGMA user_version` records how many ran.
const MIGRATIONS: &[&str] = &["CREATE TABLE IF NOT EXISTS pages (
        url        TEXT    NOT NULL,
        user_name  TEXT    NOT NULL,
        created_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER))
    );
    CREATE INDEX IF NOT EXISTS idx_pages_user_url ON pages (user_name, url);"];

#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Bound on open + schema bootstrap + ping.
    pub connect_timeout: Duration,
    /// Bound on every store operation.
    pub op_timeout: Duration,
    /// How long SQLite waits on a locked database before giving up.
    pub busy_timeout: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            op_timeout: Duration::from_secs(10),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    settings: StoreSettings,
}

impl SqliteStorage {
    /// Opens the database named by `connection_string` (a file path, a
    /// `file:` URI or `:memory:`), applies the schema and pings it, failing
    /// fast once `settings.connect_timeout` has passed.
    pub async fn open(connection_string: &str, settings: StoreSettings) -> StorageResult<Self> {
        let started_at = Instant::now();
        adviser_info!("event=store_open status=start");

        let target = connection_string.to_string();
        let busy_timeout = settings.busy_timeout;
        let opened = run_blocking(settings.connect_timeout, "can't connect to storage", move || {
            open_connection(&target, busy_timeout)
        })
        .await;

        match opened {
            Ok(conn) => {
                adviser_info!(
                    "event=store_open status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    conn: Arc::new(Mutex::new(conn)),
                    settings,
                })
            }
            Err(err) => {
                adviser_error!(
                    "event=store_open status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Private in-memory database, mostly for tests.
    pub async fn open_in_memory() -> StorageResult<Self> {
        Self::open(":memory:", StoreSettings::default()).await
    }

    async fn with_conn<T, F>(&self, context: &'static str, job: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        run_blocking(self.settings.op_timeout, context, move || {
            let guard = conn
                .lock()
                .map_err(|_| BackendError::Worker("connection lock poisoned".to_string()))?;
            job(&guard).map_err(BackendError::from)
        })
        .await
    }
}

#[async_trait::async_trait]
impl PageStore for SqliteStorage {
    async fn save(&self, page: &Page) -> StorageResult<()> {
        let page = page.clone();
        self.with_conn("can't save page", move |conn| {
            conn.execute(
                "INSERT INTO pages (url, user_name) VALUES (?1, ?2)",
                params![page.url, page.owner],
            )
            .map(|_| ())
        })
        .await
    }

    async fn pick_random(&self, owner: &str) -> StorageResult<Page> {
        let owner = owner.to_string();
        let picked = self
            .with_conn("can't pick random page", move |conn| {
                conn.query_row(
                    "SELECT url, user_name FROM pages
                     WHERE user_name = ?1
                     ORDER BY RANDOM()
                     LIMIT 1",
                    params![owner],
                    |row| Ok(Page::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()
            })
            .await?;

        picked.ok_or(StorageError::NoSavedPages)
    }

    async fn remove(&self, page: &Page) -> StorageResult<()> {
        let page = page.clone();
        let removed = self
            .with_conn("can't remove page", move |conn| {
                conn.execute(
                    "DELETE FROM pages WHERE url = ?1 AND user_name = ?2",
                    params![page.url, page.owner],
                )
            })
            .await?;
        adviser_debug!("event=page_remove rows={}", removed);
        Ok(())
    }

    async fn is_exists(&self, page: &Page) -> StorageResult<bool> {
        let page = page.clone();
        let count: i64 = self
            .with_conn("can't check if page exists", move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM pages WHERE url = ?1 AND user_name = ?2",
                    params![page.url, page.owner],
                    |row| row.get(0),
                )
            })
            .await?;
        Ok(count > 0)
    }
}

async fn run_blocking<T, F>(limit: Duration, context: &'static str, job: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(job);
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result.map_err(|source| StorageError::failure(context, source)),
        Ok(Err(join_err)) => Err(StorageError::failure(
            context,
            BackendError::Worker(join_err.to_string()),
        )),
        Err(_) => Err(StorageError::failure(context, BackendError::Timeout(limit))),
    }
}

fn open_connection(target: &str, busy_timeout: Duration) -> Result<Connection, BackendError> {
    let mut conn = Connection::open(target)?;
    conn.busy_timeout(busy_timeout)?;
    apply_migrations(&mut conn)?;
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
    Ok(conn)
}

/// Runs every pending step in one transaction; a failing step leaves the
/// schema and `user_version` untouched.
fn apply_migrations(conn: &mut Connection) -> Result<(), BackendError> {
    let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let latest = MIGRATIONS.len() as u32;
    if current > latest {
        return Err(BackendError::SchemaVersion {
            found: current,
            supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        tx.execute_batch(sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", index + 1))?;
    }
    tx.commit()?;
    adviser_info!("event=store_migrate from={} to={}", current, latest);
    Ok(())
}
