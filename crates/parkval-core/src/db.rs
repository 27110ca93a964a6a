//! `SQLite` helpers for the storage layers (currently the notification outbox).

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Storage errors shared by every `SQLite`-backed store.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("cannot create database directory {dir}: {source}")]
    CreateDir {
        dir: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open database: {0}")]
    Open(#[source] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

fn options(url: &str) -> Result<SqliteConnectOptions, DatabaseError> {
    Ok(SqliteConnectOptions::from_str(url)
        .map_err(DatabaseError::Open)?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true))
}

async fn connect(
    options: SqliteConnectOptions,
    max_connections: u32,
) -> Result<Pool<Sqlite>, DatabaseError> {
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(DatabaseError::Open)
}

/// Open (creating if needed) a WAL-mode database file, creating its parent
/// directory first.
pub async fn open_pool(path: &Path) -> Result<Pool<Sqlite>, DatabaseError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| DatabaseError::CreateDir {
            dir: dir.display().to_string(),
            source,
        })?;
    }

    let opts = options(&format!("sqlite:{}?mode=rwc", path.display()))?
        .busy_timeout(Duration::from_secs(5));
    let pool = connect(opts, 4).await?;
    info!(path = %path.display(), "Opened outbox store");
    Ok(pool)
}

/// Single-connection in-memory database; every pool is a fresh, empty store.
pub async fn open_pool_in_memory() -> Result<Pool<Sqlite>, DatabaseError> {
    connect(options("sqlite::memory:")?, 1).await
}

/// Seconds since the Unix epoch, as stored in timestamp columns.
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// Declare a store type backed by a migrated `SQLite` pool.
///
/// ```ignore
/// parkval_core::define_database!(NotificationOutbox, "Notification outbox migrations complete");
/// ```
///
/// The type gets `open(path)`, `open_in_memory()` and `pool()`. Both
/// constructors apply the migrations in `./migrations` of the crate that
/// invokes the macro before returning.
#[macro_export]
macro_rules! define_database {
    ($name:ident, $migrated:expr) => {
        #[derive(Clone)]
        pub struct $name {
            pool: ::sqlx::Pool<::sqlx::Sqlite>,
        }

        impl $name {
            pub async fn open(
                path: &::std::path::Path,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                Self::migrated($crate::db::open_pool(path).await?).await
            }

            pub async fn open_in_memory() -> ::std::result::Result<Self, $crate::db::DatabaseError>
            {
                Self::migrated($crate::db::open_pool_in_memory().await?).await
            }

            async fn migrated(
                pool: ::sqlx::Pool<::sqlx::Sqlite>,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                ::sqlx::migrate!("./migrations").run(&pool).await?;
                ::tracing::debug!($migrated);
                Ok(Self { pool })
            }

            pub const fn pool(&self) -> &::sqlx::Pool<::sqlx::Sqlite> {
                &self.pool
            }
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_after_2024() {
        assert!(unix_timestamp() > 1_704_067_200);
    }

    #[tokio::test]
    async fn in_memory_pool_answers_queries() {
        let pool = open_pool_in_memory().await.unwrap();
        let (one,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn file_pool_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("outbox.db");
        let pool = open_pool(&path).await.unwrap();
        sqlx::query("CREATE TABLE t (x INTEGER)").execute(&pool).await.unwrap();
        assert!(path.exists());
    }
}
