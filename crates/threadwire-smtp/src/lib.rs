//! # threadwire-smtp
//!
//! Minimal async SMTP client implementing the RFC 5321 subset threadwire
//! needs for outbound dispatch: EHLO, STARTTLS, AUTH PLAIN, MAIL FROM,
//! RCPT TO, DATA, QUIT.
//!
//! The client uses the type-state pattern so that invalid command
//! sequences do not compile:
//!
//! ```text
//! Connected ── auth_plain() ──→ Authenticated
//!      │                             │
//!      └──── starttls() ──→ Connected│
//!                                    ▼
//!                  MailTransaction ──→ RecipientAdded ──→ Data
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use threadwire_smtp::{Address, Client, connection::connect_tls};
//!
//! let stream = connect_tls("smtp.example.com", 465).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.ehlo("localhost").await?;
//! let client = client.auth_plain("user", "password").await?;
//!
//! let client = client.mail_from(Address::new("us@example.com")?).await?;
//! let client = client.rcpt_to(Address::new("them@example.com")?).await?;
//! let client = client.data().await?;
//! let client = client.send_message(b"Subject: hi\r\n\r\nHello!\r\n").await?;
//! client.quit().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod command;
pub mod connection;
mod error;
mod reply;

pub use address::Address;
pub use command::Command;
pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo,
};
pub use error::{Error, Result};
pub use reply::{Reply, ReplyCode};
