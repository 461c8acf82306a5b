//! The sync orchestrator: one sequential sync pass, classified errors.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::Database;
use crate::sync::{Mailbox, MailboxConnector, MailboxError, SyncEngine};

/// Result of a successful sync pass (`POST /mail/sync` body).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Messages stored as replies.
    pub processed: u32,
    /// Messages observed and deliberately skipped.
    pub skipped: u32,
}

/// The stable error taxonomy surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The mailbox rejected the configured credentials. Not retried
    /// automatically.
    #[error("Invalid mailbox credentials")]
    AuthFailed,

    /// DNS or routing failure. Safe to retry on the next trigger.
    #[error("Mailbox host not reachable")]
    HostUnreachable,

    /// The host refused the connection. Safe to retry.
    #[error("Mailbox connection refused")]
    ConnectionRefused,

    /// Connect or fetch exceeded its bound. Safe to retry.
    #[error("Mailbox connection timed out")]
    Timeout,

    /// TLS negotiation failed; configuration or environment issue.
    #[error("Mailbox TLS negotiation failed")]
    TlsFailed,

    /// No active mailbox is configured.
    #[error("No active mailbox configuration")]
    NoActiveMailbox,

    /// A sync pass is already in flight; the trigger was rejected.
    #[error("A sync pass is already running")]
    Busy,

    /// Anything unclassified; details are logged, not surfaced.
    #[error("Unknown error occurred during sync")]
    Unknown,
}

impl SyncError {
    /// Stable machine-readable code for the REST error body.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AuthFailed => "AUTH_FAILED",
            Self::HostUnreachable => "HOST_UNREACHABLE",
            Self::ConnectionRefused => "CONNECTION_REFUSED",
            Self::Timeout => "TIMEOUT",
            Self::TlsFailed => "TLS_FAILED",
            Self::NoActiveMailbox => "NO_ACTIVE_MAILBOX",
            Self::Busy => "SYNC_BUSY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<MailboxError> for SyncError {
    fn from(error: MailboxError) -> Self {
        match error {
            MailboxError::Auth(_) => Self::AuthFailed,
            MailboxError::HostUnreachable(_) => Self::HostUnreachable,
            MailboxError::ConnectionRefused(_) => Self::ConnectionRefused,
            MailboxError::Timeout(_) => Self::Timeout,
            MailboxError::Tls(_) => Self::TlsFailed,
            MailboxError::Other(detail) => {
                error!(%detail, "unclassified mailbox error");
                Self::Unknown
            }
        }
    }
}

impl From<crate::Error> for SyncError {
    fn from(error: crate::Error) -> Self {
        error!(%error, "storage failure during sync");
        Self::Unknown
    }
}

/// Drives one sync pass at a time against the active mailbox.
///
/// The watermark has a single writer: passes are serialized by a
/// non-blocking guard, and a second trigger while one pass is in flight
/// is rejected with [`SyncError::Busy`] rather than queued.
#[derive(Debug)]
pub struct SyncService<C> {
    db: Database,
    connector: C,
    guard: tokio::sync::Mutex<()>,
}

impl<C: MailboxConnector> SyncService<C> {
    /// Creates the orchestrator.
    #[must_use]
    pub fn new(db: Database, connector: C) -> Self {
        Self {
            db,
            connector,
            guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Runs one full sync pass: connect, fetch past the watermark,
    /// process the batch, commit the watermark, disconnect.
    ///
    /// A failure at any point leaves the watermark untouched; the next
    /// pass re-observes the same batch and the store's idempotence makes
    /// the replay safe.
    ///
    /// # Errors
    ///
    /// Returns a classified [`SyncError`]; see the taxonomy on the type.
    pub async fn run_once(&self) -> Result<SyncSummary, SyncError> {
        let Ok(_running) = self.guard.try_lock() else {
            warn!("sync trigger rejected: pass already in flight");
            return Err(SyncError::Busy);
        };

        let Some(state) = self.db.sync_states().active().await? else {
            return Err(SyncError::NoActiveMailbox);
        };

        let mut mailbox = self.connector.connect(&state).await?;

        let messages = match mailbox.fetch_newer_than(state.last_uid).await {
            Ok(messages) => messages,
            Err(e) => {
                mailbox.close().await;
                return Err(e.into());
            }
        };

        if messages.is_empty() {
            mailbox.close().await;
            info!(last_uid = state.last_uid, "no new mail");
            return Ok(SyncSummary::default());
        }

        let threads = self.db.threads();
        let engine = SyncEngine::new(&threads);
        let outcome = match engine.process_batch(messages).await {
            Ok(outcome) => outcome,
            Err(e) => {
                mailbox.close().await;
                return Err(e.into());
            }
        };

        // Commit only after the whole batch is durable; skipped messages
        // move the watermark too.
        if let Some(highest_uid) = outcome.highest_uid {
            self.db
                .sync_states()
                .commit_watermark(state.id, highest_uid)
                .await?;
        }

        mailbox.close().await;

        info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            "sync pass complete"
        );
        Ok(SyncSummary {
            processed: outcome.processed,
            skipped: outcome.skipped,
        })
    }
}
