//! Mailbox synchronization: watermark state, the sync engine, and the
//! IMAP-backed mailbox implementation.

mod engine;
mod imap_mailbox;
mod state;

pub use engine::{BatchOutcome, Mailbox, MailboxError, RawMessage, SyncEngine};
pub use imap_mailbox::{ImapConnector, ImapMailbox, MailboxConnector};
pub use state::{NewSyncState, ProviderSyncState, SyncStateId, SyncStateRepository};
