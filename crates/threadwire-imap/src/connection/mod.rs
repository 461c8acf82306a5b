//! Connection management: streams, response framing, and the type-state
//! client.

mod client;
mod framed;
mod stream;

pub use client::{Authenticated, Client, MailboxStatus, NotAuthenticated, Selected};
pub use framed::{FramedStream, ResponseLine};
pub use stream::{ImapStream, connect_plain, connect_tls};
