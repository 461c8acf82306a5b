//! # threadwire-imap
//!
//! Minimal async IMAP client implementing the RFC 3501 subset a stateful
//! watermark poll needs: LOGIN, SELECT, `UID FETCH` with `BODY.PEEK[]`,
//! and LOGOUT, over TLS via rustls.
//!
//! The client uses the type-state pattern to enforce valid state
//! transitions at compile time:
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── select() ──→ Selected
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use threadwire_imap::{Client, connection::connect_tls};
//!
//! let stream = connect_tls("imap.example.com", 993).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.login("user@example.com", "password").await?;
//! let (mut client, status) = client.select("INBOX").await?;
//!
//! // Everything strictly newer than the watermark, ascending by UID.
//! for message in client.uid_fetch_newer_than(last_uid).await? {
//!     println!("uid {} ({} bytes)", message.uid, message.body.len());
//! }
//!
//! client.logout().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod command;
pub mod connection;
mod error;
mod fetch;

pub use command::{Command, TagGenerator};
pub use connection::{
    Authenticated, Client, FramedStream, ImapStream, MailboxStatus, NotAuthenticated, Selected,
};
pub use error::{Error, Result};
pub use fetch::FetchedMessage;
