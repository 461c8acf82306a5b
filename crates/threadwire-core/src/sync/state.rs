//! Mailbox sync state: the persistent UID watermark.

use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::Result;

/// Unique identifier for a sync state row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncStateId(pub i64);

/// One configured mailbox and its incremental-fetch watermark.
///
/// `last_uid` is the highest UID already fully processed; it only ever
/// increases, and only after a whole batch has been durably written.
#[derive(Debug, Clone)]
pub struct ProviderSyncState {
    /// Unique identifier.
    pub id: SyncStateId,
    /// Informational provider label (e.g. "gmail").
    pub provider_type: String,
    /// IMAP host.
    pub host: String,
    /// IMAP port.
    pub port: u16,
    /// Mailbox username.
    pub username: String,
    /// Mailbox password.
    pub password: String,
    /// Exactly-once-processing boundary.
    pub last_uid: u32,
    /// Whether this mailbox is polled.
    pub is_active: bool,
}

/// Fields for configuring a mailbox (admin surface and tests).
#[derive(Debug, Clone)]
pub struct NewSyncState {
    /// Informational provider label.
    pub provider_type: String,
    /// IMAP host.
    pub host: String,
    /// IMAP port.
    pub port: u16,
    /// Mailbox username.
    pub username: String,
    /// Mailbox password.
    pub password: String,
    /// Whether this mailbox is polled.
    pub is_active: bool,
}

/// Repository for `ProviderSyncState` rows.
#[derive(Debug, Clone)]
pub struct SyncStateRepository {
    pool: SqlitePool,
}

impl SyncStateRepository {
    /// Creates a repository over an open pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a sync state row with a zero watermark.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(&self, new: &NewSyncState) -> Result<ProviderSyncState> {
        let result = sqlx::query(
            r"
            INSERT INTO provider_sync_state
                (provider_type, host, port, username, password, last_uid, is_active)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            ",
        )
        .bind(&new.provider_type)
        .bind(&new.host)
        .bind(i64::from(new.port))
        .bind(&new.username)
        .bind(&new.password)
        .bind(new.is_active)
        .execute(&self.pool)
        .await?;

        Ok(ProviderSyncState {
            id: SyncStateId(result.last_insert_rowid()),
            provider_type: new.provider_type.clone(),
            host: new.host.clone(),
            port: new.port,
            username: new.username.clone(),
            password: new.password.clone(),
            last_uid: 0,
            is_active: new.is_active,
        })
    }

    /// Returns the active mailbox configuration, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn active(&self) -> Result<Option<ProviderSyncState>> {
        let row = sqlx::query(
            r"
            SELECT id, provider_type, host, port, username, password, last_uid, is_active
            FROM provider_sync_state
            WHERE is_active = 1
            LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let port: i64 = row.get("port");
            let last_uid: i64 = row.get("last_uid");
            ProviderSyncState {
                id: SyncStateId(row.get("id")),
                provider_type: row.get("provider_type"),
                host: row.get("host"),
                port: u16::try_from(port).unwrap_or_default(),
                username: row.get("username"),
                password: row.get("password"),
                last_uid: u32::try_from(last_uid).unwrap_or_default(),
                is_active: row.get("is_active"),
            }
        }))
    }

    /// Advances the watermark after a fully processed batch.
    ///
    /// Monotonic by construction: the update is guarded by
    /// `last_uid < new value`, so replays and races can never move the
    /// watermark backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn commit_watermark(&self, id: SyncStateId, new_last_uid: u32) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE provider_sync_state SET last_uid = ? WHERE id = ? AND last_uid < ?",
        )
        .bind(i64::from(new_last_uid))
        .bind(id.0)
        .bind(i64::from(new_last_uid))
        .execute(&self.pool)
        .await?;

        debug!(
            sync_state = id.0,
            new_last_uid,
            applied = updated.rows_affected() > 0,
            "watermark commit"
        );
        Ok(())
    }

    /// Current watermark for a sync state row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is missing or the query fails.
    pub async fn watermark(&self, id: SyncStateId) -> Result<u32> {
        let value: i64 =
            sqlx::query_scalar("SELECT last_uid FROM provider_sync_state WHERE id = ?")
                .bind(id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(u32::try_from(value).unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Database;

    fn mailbox_config(active: bool) -> NewSyncState {
        NewSyncState {
            provider_type: "gmail".to_string(),
            host: "imap.example.com".to_string(),
            port: 993,
            username: "sync@example.com".to_string(),
            password: "app-password".to_string(),
            is_active: active,
        }
    }

    #[tokio::test]
    async fn active_returns_only_active_rows() {
        let db = Database::in_memory().await.unwrap();
        let states = db.sync_states();

        states.create(&mailbox_config(false)).await.unwrap();
        assert!(states.active().await.unwrap().is_none());

        let created = states.create(&mailbox_config(true)).await.unwrap();
        let active = states.active().await.unwrap().unwrap();
        assert_eq!(active.id, created.id);
        assert_eq!(active.last_uid, 0);
        assert_eq!(active.port, 993);
    }

    #[tokio::test]
    async fn watermark_only_moves_forward() {
        let db = Database::in_memory().await.unwrap();
        let states = db.sync_states();
        let state = states.create(&mailbox_config(true)).await.unwrap();

        states.commit_watermark(state.id, 40).await.unwrap();
        assert_eq!(states.watermark(state.id).await.unwrap(), 40);

        // A stale commit is a no-op, not an error.
        states.commit_watermark(state.id, 25).await.unwrap();
        assert_eq!(states.watermark(state.id).await.unwrap(), 40);

        states.commit_watermark(state.id, 41).await.unwrap();
        assert_eq!(states.watermark(state.id).await.unwrap(), 41);
    }

    #[tokio::test]
    async fn equal_commit_is_a_no_op() {
        let db = Database::in_memory().await.unwrap();
        let states = db.sync_states();
        let state = states.create(&mailbox_config(true)).await.unwrap();

        states.commit_watermark(state.id, 10).await.unwrap();
        states.commit_watermark(state.id, 10).await.unwrap();
        assert_eq!(states.watermark(state.id).await.unwrap(), 10);
    }
}
