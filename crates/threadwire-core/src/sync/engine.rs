//! The mailbox sync engine: one sequential pass over newly fetched mail.

use thiserror::Error;
use tracing::{debug, warn};

use threadwire_mime::{Mail, reply_text};

use crate::thread::{NewReply, ThreadRepository};

/// A raw message pulled from the mailbox: UID plus full RFC 5322 source.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Mailbox UID.
    pub uid: u32,
    /// Raw message source.
    pub source: Vec<u8>,
}

/// Classified mailbox transport failures.
///
/// The variants mirror the orchestrator's error taxonomy so the transport
/// layer is the single place failures are classified.
#[derive(Debug, Error)]
pub enum MailboxError {
    /// The mailbox rejected the configured credentials.
    #[error("mailbox authentication failed: {0}")]
    Auth(String),

    /// DNS or routing failure reaching the host.
    #[error("mailbox host unreachable: {0}")]
    HostUnreachable(String),

    /// The host actively refused the connection.
    #[error("mailbox connection refused: {0}")]
    ConnectionRefused(String),

    /// Connect or fetch exceeded its bound.
    #[error("mailbox operation timed out: {0}")]
    Timeout(String),

    /// TLS negotiation failed.
    #[error("TLS negotiation failed: {0}")]
    Tls(String),

    /// Anything else.
    #[error("mailbox error: {0}")]
    Other(String),
}

/// The engine's seam to the mailbox transport.
///
/// Implementations must return messages in ascending UID order, strictly
/// newer than `last_uid` (transport quirks such as IMAP's `n:*` echoing
/// the last message are handled below this trait).
pub trait Mailbox {
    /// Fetches every message with UID strictly greater than `last_uid`.
    fn fetch_newer_than(
        &mut self,
        last_uid: u32,
    ) -> impl Future<Output = std::result::Result<Vec<RawMessage>, MailboxError>> + Send;

    /// Releases the mailbox session. Best effort; errors are discarded.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Outcome of processing one fetched batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Messages stored as replies.
    pub processed: u32,
    /// Messages observed and deliberately not stored.
    pub skipped: u32,
    /// Highest UID seen across stored *and* skipped messages; the
    /// watermark candidate.
    pub highest_uid: Option<u32>,
}

/// Processes fetched messages into stored replies.
///
/// Per message, in ascending UID order: parse, extract threading headers,
/// skip non-replies and unmatched replies, clean the body, and append the
/// reply. A parse failure skips that one message; a storage failure
/// aborts the whole batch so the caller leaves the watermark untouched.
#[derive(Debug)]
pub struct SyncEngine<'a> {
    threads: &'a ThreadRepository,
}

impl<'a> SyncEngine<'a> {
    /// Creates an engine writing through the given repository.
    #[must_use]
    pub const fn new(threads: &'a ThreadRepository) -> Self {
        Self { threads }
    }

    /// Runs one batch to completion.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage failures; per-message parse and
    /// match misses are counted as skips.
    pub async fn process_batch(
        &self,
        mut messages: Vec<RawMessage>,
    ) -> crate::Result<BatchOutcome> {
        // Ascending UID order keeps received_at ordering predictable when
        // several replies to one thread arrive in the same batch.
        messages.sort_by_key(|m| m.uid);

        let mut outcome = BatchOutcome::default();
        for message in &messages {
            // The watermark must move past skipped messages too, or they
            // would be re-fetched forever.
            outcome.highest_uid = Some(message.uid);

            if self.process_message(message).await? {
                outcome.processed += 1;
            } else {
                outcome.skipped += 1;
            }
        }

        debug!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            highest_uid = outcome.highest_uid,
            "batch complete"
        );
        Ok(outcome)
    }

    /// Handles one message; `Ok(true)` means a reply was stored.
    async fn process_message(&self, message: &RawMessage) -> crate::Result<bool> {
        let source = String::from_utf8_lossy(&message.source);
        let mail = match Mail::parse(&source) {
            Ok(mail) => mail,
            Err(e) => {
                warn!(uid = message.uid, error = %e, "unparseable message, skipping");
                return Ok(false);
            }
        };

        let Some(message_id) = mail.message_id().map(str::to_string) else {
            warn!(uid = message.uid, "message without Message-ID, skipping");
            return Ok(false);
        };

        let Some(in_reply_to) = mail.in_reply_to().map(str::to_string) else {
            // Unsolicited inbound mail; this engine only tracks replies.
            debug!(uid = message.uid, "not a reply, skipping");
            return Ok(false);
        };

        let Some(thread) = self.threads.find_by_message_id(&in_reply_to).await? else {
            warn!(uid = message.uid, %in_reply_to, "no matching thread, skipping");
            return Ok(false);
        };

        let raw_body = mail.body_html().or_else(|| mail.body_text()).unwrap_or("");
        let reply_body = reply_text::clean(raw_body);

        let reply = self
            .threads
            .append_reply(&NewReply {
                thread_id: thread.id,
                customer_id: thread.customer_id,
                reply_body,
                sender_email: mail.from_addr().unwrap_or_default().to_string(),
                message_id,
                in_reply_to,
            })
            .await?;

        debug!(uid = message.uid, thread_id = %thread.id, reply_id = reply.id.0, "reply stored");
        Ok(true)
    }
}
