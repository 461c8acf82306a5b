//! # threadwire-core
//!
//! The email thread synchronization and reply-matching engine of the
//! threadwire CRM backend.
//!
//! This crate provides:
//! - **Thread Store** - `EmailThread`/`EmailReply` persistence with
//!   idempotent reply ingestion (`SQLite` via sqlx)
//! - **Provider Dispatcher** - outbound mail through SMTP or a
//!   transactional HTTP API, selected by a closed provider enum
//! - **Mailbox Sync Engine** - incremental IMAP polling behind a
//!   persistent UID watermark, reply→thread matching by `In-Reply-To`
//! - **Sync Orchestrator** - one sequential sync pass at a time, with a
//!   stable error taxonomy for callers
//! - **Service layer** - the send/reply/history operations and DTO shapes
//!   the (out-of-scope) HTTP layer exposes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod customer;
mod db;
pub mod dispatch;
mod error;
pub mod service;
pub mod sync;
pub mod thread;

pub use customer::{Customer, CustomerRepository};
pub use db::Database;
pub use dispatch::{
    Dispatch, Dispatched, Dispatcher, HttpProvider, Outbound, ProviderConfig, Security, SendError,
    SmtpProvider,
};
pub use error::{Error, Result};
pub use service::{
    MailService, MailServiceError, ReplyRequest, SendEmailRequest, SyncError, SyncService,
    SyncSummary,
};
pub use sync::{
    BatchOutcome, ImapConnector, Mailbox, MailboxConnector, MailboxError, ProviderSyncState,
    RawMessage, SyncEngine, SyncStateRepository,
};
pub use thread::{
    CustomerId, EmailReply, EmailThread, NewReply, NewThread, Page, ReplyId, ThreadId,
    ThreadRepository, ThreadStats, ThreadStatus, ThreadWithReplies,
};
