//! # threadwire-mime
//!
//! Mail message parsing and reply-text extraction for threadwire.
//!
//! This crate provides:
//! - **Header parsing**: RFC 822 header maps with unfolding and
//!   case-insensitive lookup
//! - **Body extraction**: multipart walking with transfer-encoding decode,
//!   yielding the `text/plain` and `text/html` parts of a raw message
//! - **Reply-text cleaning**: stripping quoted previous messages and markup
//!   from an inbound body, leaving only the human-authored portion
//!
//! Everything here is pure text processing: no I/O, no state.
//!
//! ## Quick Start
//!
//! ```ignore
//! use threadwire_mime::{Mail, reply_text};
//!
//! let mail = Mail::parse(raw_source)?;
//! if let Some(in_reply_to) = mail.in_reply_to() {
//!     let body = mail.body_html().or(mail.body_text()).unwrap_or("");
//!     let cleaned = reply_text::clean(body);
//!     println!("reply to {in_reply_to}: {cleaned}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod header;
mod message;

pub mod encoding;
pub mod reply_text;

pub use error::{Error, Result};
pub use header::Headers;
pub use message::Mail;
