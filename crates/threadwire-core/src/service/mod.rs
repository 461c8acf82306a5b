//! Service layer: the operations and DTO shapes the (out-of-scope) HTTP
//! layer exposes.

mod mail;
mod sync;

pub use mail::{MailService, MailServiceError, ReplyRequest, SendEmailRequest};
pub use sync::{SyncError, SyncService, SyncSummary};
