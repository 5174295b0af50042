use std::collections::HashMap;
use std::sync::Once;
use std::time::{Duration, Instant};

use adviser_core::Page;
use adviser_engine::{BackendError, PageStore, SqliteStorage, StorageError, StoreSettings};
use tempfile::TempDir;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(adviser_logging::initialize_for_tests);
}

async fn memory_store() -> SqliteStorage {
    init_logging();
    SqliteStorage::open_in_memory().await.expect("open in-memory store")
}

#[tokio::test]
async fn exists_follows_save_and_remove() {
    let store = memory_store().await;
    let page = Page::new("http://a", "alice");

    assert!(!store.is_exists(&page).await.unwrap());
    store.save(&page).await.unwrap();
    assert!(store.is_exists(&page).await.unwrap());
    assert!(store.is_exists(&page).await.unwrap());

    store.remove(&page).await.unwrap();
    assert!(!store.is_exists(&page).await.unwrap());
}

#[tokio::test]
async fn identity_is_the_literal_pair() {
    let store = memory_store().await;
    store.save(&Page::new("http://a", "alice")).await.unwrap();

    assert!(!store.is_exists(&Page::new("http://a/", "alice")).await.unwrap());
    assert!(!store.is_exists(&Page::new("HTTP://A", "alice")).await.unwrap());
    assert!(!store.is_exists(&Page::new("http://a", "bob")).await.unwrap());
}

#[tokio::test]
async fn remove_of_missing_page_succeeds() {
    let store = memory_store().await;
    store.remove(&Page::new("http://nowhere", "alice")).await.unwrap();
    store.remove(&Page::new("http://nowhere", "alice")).await.unwrap();
}

#[tokio::test]
async fn save_does_not_deduplicate_but_remove_clears_all_copies() {
    let store = memory_store().await;
    let page = Page::new("http://a", "alice");
    store.save(&page).await.unwrap();
    store.save(&page).await.unwrap();

    store.remove(&page).await.unwrap();
    assert!(!store.is_exists(&page).await.unwrap());
    assert!(store.pick_random("alice").await.unwrap_err().is_no_saved_pages());
}

#[tokio::test]
async fn pick_random_on_empty_owner_reports_no_saved_pages() {
    let store = memory_store().await;
    store.save(&Page::new("http://a", "alice")).await.unwrap();

    let err = store.pick_random("bob").await.unwrap_err();
    assert!(matches!(err, StorageError::NoSavedPages));
}

#[tokio::test]
async fn pick_random_is_scoped_to_owner_and_roughly_uniform() {
    let store = memory_store().await;
    store.save(&Page::new("http://a", "alice")).await.unwrap();
    store.save(&Page::new("http://b", "alice")).await.unwrap();
    store.save(&Page::new("http://c", "bob")).await.unwrap();

    let trials = 2000;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..trials {
        let page = store.pick_random("alice").await.unwrap();
        assert_eq!(page.owner, "alice");
        *counts.entry(page.url).or_default() += 1;
    }

    assert_eq!(counts.len(), 2);
    for url in ["http://a", "http://b"] {
        let share = counts[url] as f64 / trials as f64;
        assert!(
            (0.4..=0.6).contains(&share),
            "{url} picked with share {share}"
        );
    }
}

#[tokio::test]
async fn walkthrough_from_save_to_empty() {
    let store = memory_store().await;
    let a = Page::new("http://a", "alice");
    let b = Page::new("http://b", "alice");
    store.save(&a).await.unwrap();
    store.save(&b).await.unwrap();

    let picked = store.pick_random("alice").await.unwrap();
    assert!(picked == a || picked == b);
    assert!(store.is_exists(&a).await.unwrap());

    store.remove(&a).await.unwrap();
    assert!(!store.is_exists(&a).await.unwrap());
    assert_eq!(store.pick_random("alice").await.unwrap(), b);

    assert!(store.pick_random("bob").await.unwrap_err().is_no_saved_pages());
}

#[tokio::test]
async fn file_database_survives_reopen() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pages.db");
    let path = path.to_str().unwrap();
    let page = Page::new("https://example.com/post", "carol");

    {
        let store = SqliteStorage::open(path, StoreSettings::default()).await.unwrap();
        store.save(&page).await.unwrap();
    }

    let reopened = SqliteStorage::open(path, StoreSettings::default()).await.unwrap();
    assert!(reopened.is_exists(&page).await.unwrap());
    assert_eq!(reopened.pick_random("carol").await.unwrap(), page);
}

#[tokio::test]
async fn unreachable_database_fails_fast_with_storage_failure() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing").join("dir").join("pages.db");

    let err = SqliteStorage::open(path.to_str().unwrap(), StoreSettings::default())
        .await
        .err()
        .expect("opening under a missing directory must fail");

    assert!(matches!(
        err,
        StorageError::Failure {
            source: BackendError::Sqlite(_),
            ..
        }
    ));
    assert!(!err.is_no_saved_pages());
}

#[tokio::test]
async fn newer_schema_is_rejected() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("future.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();
    }

    let err = SqliteStorage::open(path.to_str().unwrap(), StoreSettings::default())
        .await
        .err()
        .expect("schema from the future must be rejected");

    assert!(matches!(
        err,
        StorageError::Failure {
            source: BackendError::SchemaVersion { found: 99, .. },
            ..
        }
    ));
}

#[test]
fn locked_database_times_out_without_holding_up_shutdown() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("locked.db");
    let holder = rusqlite::Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let settings = StoreSettings {
        connect_timeout: Duration::from_millis(100),
        busy_timeout: Duration::from_secs(3),
        ..StoreSettings::default()
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    let started_at = Instant::now();
    let result = runtime.block_on(SqliteStorage::open(path.to_str().unwrap(), settings));
    let err = result.err().expect("a locked database must not open");
    assert!(matches!(
        err,
        StorageError::Failure {
            source: BackendError::Timeout(limit),
            ..
        } if limit == Duration::from_millis(100)
    ));
    assert!(started_at.elapsed() < Duration::from_secs(1));

    // The open is still waiting on the lock in the blocking pool.
    runtime.shutdown_background();
    assert!(started_at.elapsed() < Duration::from_secs(1));

    holder.execute_batch("ROLLBACK;").unwrap();
}

#[tokio::test]
async fn schema_version_is_recorded_after_open() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("pages.db");
    let path = path.to_str().unwrap();

    SqliteStorage::open(path, StoreSettings::default()).await.unwrap();
    SqliteStorage::open(path, StoreSettings::default()).await.unwrap();

    let conn = rusqlite::Connection::open(path).unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, 1);
}

#[tokio::test]
async fn failed_migration_leaves_schema_untouched() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.db");
    {
        // A view named like the table: the table step is skipped, indexing it fails.
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE VIEW pages AS SELECT 'x' AS url, 'y' AS user_name;")
            .unwrap();
    }

    let err = SqliteStorage::open(path.to_str().unwrap(), StoreSettings::default())
        .await
        .err()
        .expect("indexing a view must fail");
    assert!(matches!(
        err,
        StorageError::Failure {
            source: BackendError::Sqlite(_),
            ..
        }
    ));

    let conn = rusqlite::Connection::open(&path).unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, 0);
    let indexes: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_pages_user_url'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(indexes, 0);
}
