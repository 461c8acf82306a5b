//! Connection management: streams and the type-state client.

mod client;
mod stream;

pub use client::{Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded};
pub use stream::{SmtpStream, connect, connect_tls};

/// Capabilities discovered from the EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Hostname the server announced in its greeting.
    pub hostname: String,
    /// Whether STARTTLS was offered.
    pub starttls: bool,
    /// Whether AUTH PLAIN was offered.
    pub auth_plain: bool,
}
