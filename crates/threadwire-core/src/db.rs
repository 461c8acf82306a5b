//! Shared database handle and schema creation.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::customer::CustomerRepository;
use crate::sync::SyncStateRepository;
use crate::thread::ThreadRepository;
use crate::{Error, Result};

/// Shared `SQLite` handle; repositories borrow connections from one pool
/// so threads, replies, customers, and sync state live in one database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at the given path and
    /// ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema creation fails.
    pub async fn open(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Creates an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Thread and reply storage.
    #[must_use]
    pub fn threads(&self) -> ThreadRepository {
        ThreadRepository::new(self.pool.clone())
    }

    /// Customer projection storage.
    #[must_use]
    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    /// Mailbox sync state storage.
    #[must_use]
    pub fn sync_states(&self) -> SyncStateRepository {
        SyncStateRepository::new(self.pool.clone())
    }

    /// Creates all tables and indexes.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_threads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id INTEGER NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                sent_by TEXT NOT NULL,
                message_id TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL DEFAULT 'sent'
                    CHECK (status IN ('sent', 'replied')),
                sent_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_replies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id INTEGER NOT NULL,
                customer_id INTEGER NOT NULL,
                reply_body TEXT NOT NULL,
                sender_email TEXT NOT NULL,
                message_id TEXT NOT NULL UNIQUE,
                in_reply_to TEXT NOT NULL,
                received_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS provider_sync_state (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_type TEXT NOT NULL,
                host TEXT NOT NULL,
                port INTEGER NOT NULL,
                username TEXT NOT NULL,
                password TEXT NOT NULL,
                last_uid INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Lookup paths used on every sync pass and history read.
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_threads_customer
            ON email_threads(customer_id, sent_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_replies_thread
            ON email_replies(thread_id, received_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Parses an RFC 3339 timestamp column, surfacing corrupt rows as
/// database errors instead of panicking.
pub(crate) fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| Error::Config(format!("corrupt timestamp {raw:?}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        db.initialize().await.unwrap();
    }

    #[test]
    fn parse_timestamp_roundtrip() {
        let now = chrono::Utc::now();
        let parsed = parse_timestamp(&now.to_rfc3339()).unwrap();
        assert_eq!(parsed, now);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("not a date").is_err());
    }
}
