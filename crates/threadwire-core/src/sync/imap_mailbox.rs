//! IMAP-backed [`Mailbox`] implementation with bounded timeouts.

use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use threadwire_imap::connection::connect_tls;
use threadwire_imap::{Client, ImapStream, Selected};

use super::engine::{Mailbox, MailboxError, RawMessage};
use super::state::ProviderSyncState;

/// The folder inbound replies land in.
const INBOX: &str = "INBOX";

/// Opens mailbox sessions for the orchestrator. The seam exists so tests
/// can substitute a scripted mailbox.
pub trait MailboxConnector {
    /// The mailbox type this connector produces.
    type Mailbox: Mailbox;

    /// Opens a session using the given credentials.
    fn connect(
        &self,
        state: &ProviderSyncState,
    ) -> impl Future<Output = std::result::Result<Self::Mailbox, MailboxError>> + Send;
}

/// Connects to IMAP over implicit TLS.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    /// Bound on connect + login + select.
    pub connect_timeout: Duration,
    /// Bound on one full fetch.
    pub fetch_timeout: Duration,
}

impl Default for ImapConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(120),
        }
    }
}

impl MailboxConnector for ImapConnector {
    type Mailbox = ImapMailbox;

    async fn connect(
        &self,
        state: &ProviderSyncState,
    ) -> std::result::Result<ImapMailbox, MailboxError> {
        let session = timeout(self.connect_timeout, open_session(state))
            .await
            .map_err(|_| {
                MailboxError::Timeout(format!(
                    "connect to {}:{} exceeded {:?}",
                    state.host, state.port, self.connect_timeout
                ))
            })??;

        Ok(ImapMailbox {
            client: session,
            fetch_timeout: self.fetch_timeout,
        })
    }
}

/// Connect, authenticate, and select the inbox.
async fn open_session(
    state: &ProviderSyncState,
) -> std::result::Result<Client<ImapStream, Selected>, MailboxError> {
    let stream = connect_tls(&state.host, state.port)
        .await
        .map_err(classify)?;
    let client = Client::from_stream(stream).await.map_err(classify)?;
    let client = client
        .login(&state.username, &state.password)
        .await
        .map_err(classify)?;
    let (client, status) = client.select(INBOX).await.map_err(classify)?;
    debug!(host = %state.host, exists = status.exists, "mailbox session opened");
    Ok(client)
}

/// An open IMAP session implementing the engine's mailbox seam.
pub struct ImapMailbox {
    client: Client<ImapStream, Selected>,
    fetch_timeout: Duration,
}

impl Mailbox for ImapMailbox {
    async fn fetch_newer_than(
        &mut self,
        last_uid: u32,
    ) -> std::result::Result<Vec<RawMessage>, MailboxError> {
        let fetched = timeout(self.fetch_timeout, self.client.uid_fetch_newer_than(last_uid))
            .await
            .map_err(|_| {
                MailboxError::Timeout(format!("fetch exceeded {:?}", self.fetch_timeout))
            })?
            .map_err(classify)?;

        Ok(fetched
            .into_iter()
            .map(|m| RawMessage {
                uid: m.uid,
                source: m.body,
            })
            .collect())
    }

    async fn close(self) {
        // Best effort; a failed LOGOUT leaves nothing to clean up.
        let _ = self.client.logout().await;
    }
}

/// Maps transport errors onto the orchestrator's taxonomy. This is the
/// single classification point for mailbox failures.
fn classify(error: threadwire_imap::Error) -> MailboxError {
    use threadwire_imap::Error;

    match error {
        Error::Auth(text) => MailboxError::Auth(text),
        Error::Io(e) => match e.kind() {
            std::io::ErrorKind::ConnectionRefused => {
                MailboxError::ConnectionRefused(e.to_string())
            }
            std::io::ErrorKind::TimedOut => MailboxError::Timeout(e.to_string()),
            std::io::ErrorKind::NotFound => MailboxError::HostUnreachable(e.to_string()),
            _ => {
                let text = e.to_string();
                // DNS failures surface as uncategorized io errors.
                if text.contains("lookup") || text.contains("resolve") {
                    MailboxError::HostUnreachable(text)
                } else {
                    MailboxError::Other(text)
                }
            }
        },
        Error::Tls(e) => MailboxError::Tls(e.to_string()),
        Error::InvalidDnsName(e) => MailboxError::Tls(e.to_string()),
        Error::No(text) | Error::Bad(text) | Error::Bye(text) | Error::Parse(text) => {
            MailboxError::Other(text)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn classify_auth() {
        let mapped = classify(threadwire_imap::Error::Auth("bad creds".into()));
        assert!(matches!(mapped, MailboxError::Auth(_)));
    }

    #[test]
    fn classify_io_kinds() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            classify(threadwire_imap::Error::Io(refused)),
            MailboxError::ConnectionRefused(_)
        ));

        let timed_out = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow");
        assert!(matches!(
            classify(threadwire_imap::Error::Io(timed_out)),
            MailboxError::Timeout(_)
        ));

        let dns = std::io::Error::other("failed to lookup address information");
        assert!(matches!(
            classify(threadwire_imap::Error::Io(dns)),
            MailboxError::HostUnreachable(_)
        ));
    }

    #[test]
    fn classify_protocol_errors_as_other() {
        assert!(matches!(
            classify(threadwire_imap::Error::Bad("syntax".into())),
            MailboxError::Other(_)
        ));
    }
}
