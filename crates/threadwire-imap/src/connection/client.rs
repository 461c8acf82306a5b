//! Type-state IMAP client.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::framed::{FramedStream, ResponseLine};
use crate::command::{Command, TagGenerator};
use crate::error::{Error, Result};
use crate::fetch::{FetchedMessage, parse_fetch};

/// Type-state marker: connected, not yet authenticated.
#[derive(Debug)]
pub struct NotAuthenticated;

/// Type-state marker: authenticated.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker: a mailbox is selected.
#[derive(Debug)]
pub struct Selected;

/// Status of a selected mailbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages in the mailbox.
    pub exists: u32,
}

/// Outcome of a tagged command.
enum Completion {
    Ok,
    No(String),
    Bad(String),
}

/// IMAP client; the `State` parameter encodes the protocol phase.
#[derive(Debug)]
pub struct Client<S, State> {
    stream: FramedStream<S>,
    tags: TagGenerator,
    _state: PhantomData<State>,
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn transition<T>(self) -> Client<S, T> {
        Client {
            stream: self.stream,
            tags: self.tags,
            _state: PhantomData,
        }
    }

    /// Sends a command and collects untagged responses until the tagged
    /// completion arrives.
    async fn exchange(&mut self, cmd: &Command) -> Result<(Vec<ResponseLine>, Completion)> {
        let tag = self.tags.next();
        self.stream.write_command(&cmd.serialize(&tag)).await?;

        let mut untagged = Vec::new();
        loop {
            let response = self.stream.read_response().await?;

            if let Some(rest) = response.text.strip_prefix(&format!("{tag} ")) {
                let completion = if rest.starts_with("OK") {
                    Completion::Ok
                } else if let Some(text) = rest.strip_prefix("NO") {
                    Completion::No(text.trim().to_string())
                } else if let Some(text) = rest.strip_prefix("BAD") {
                    Completion::Bad(text.trim().to_string())
                } else {
                    return Err(Error::Parse(format!(
                        "unrecognized completion: {}",
                        response.text
                    )));
                };
                return Ok((untagged, completion));
            }

            if let Some(text) = response.text.strip_prefix("* BYE") {
                // BYE during LOGOUT is the normal goodbye; callers that
                // expect it treat Bye as success.
                return Err(Error::Bye(text.trim().to_string()));
            }

            untagged.push(response);
        }
    }

    /// Gracefully disconnects. Valid from any state.
    ///
    /// # Errors
    ///
    /// Returns an error only if the connection fails before LOGOUT is
    /// written; the server's BYE is expected and swallowed.
    pub async fn logout(mut self) -> Result<()> {
        match self.exchange(&Command::Logout).await {
            Ok(_) | Err(Error::Bye(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a connected stream, consuming the server
    /// greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is BYE or unrecognizable.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);
        let greeting = framed.read_response().await?;

        if let Some(text) = greeting.text.strip_prefix("* BYE") {
            return Err(Error::Bye(text.trim().to_string()));
        }
        if !greeting.text.starts_with("* OK") && !greeting.text.starts_with("* PREAUTH") {
            return Err(Error::Parse(format!(
                "unexpected greeting: {}",
                greeting.text
            )));
        }
        debug!(greeting = %greeting.text, "IMAP connection established");

        Ok(Self {
            stream: framed,
            tags: TagGenerator::default(),
            _state: PhantomData,
        })
    }

    /// Authenticates with LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the server rejects the credentials.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let cmd = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let (_, completion) = self.exchange(&cmd).await?;
        match completion {
            Completion::Ok => Ok(self.transition()),
            Completion::No(text) => Err(Error::Auth(text)),
            Completion::Bad(text) => Err(Error::Bad(text)),
        }
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailbox cannot be selected.
    pub async fn select(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let cmd = Command::Select {
            mailbox: mailbox.to_string(),
        };
        let (untagged, completion) = self.exchange(&cmd).await?;
        match completion {
            Completion::Ok => {
                let mut status = MailboxStatus::default();
                for response in &untagged {
                    if let Some(count) = parse_exists(&response.text) {
                        status.exists = count;
                    }
                }
                Ok((self.transition(), status))
            }
            Completion::No(text) => Err(Error::No(text)),
            Completion::Bad(text) => Err(Error::Bad(text)),
        }
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Fetches the full source of every message with UID strictly greater
    /// than `last_uid`, in ascending UID order.
    ///
    /// `UID FETCH n:*` always returns at least the last message in the
    /// mailbox even when its UID is below `n`; that quirk is filtered out
    /// here so callers see only genuinely new mail.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn uid_fetch_newer_than(&mut self, last_uid: u32) -> Result<Vec<FetchedMessage>> {
        let cmd = Command::UidFetchFrom {
            start: last_uid.saturating_add(1),
        };
        let tag = self.tags.next();
        self.stream.write_command(&cmd.serialize(&tag)).await?;

        let mut messages = Vec::new();
        loop {
            let response = self.stream.read_response().await?;

            if let Some(rest) = response.text.strip_prefix(&format!("{tag} ")) {
                if rest.starts_with("OK") {
                    break;
                }
                if let Some(text) = rest.strip_prefix("NO") {
                    return Err(Error::No(text.trim().to_string()));
                }
                return Err(Error::Bad(rest.trim().to_string()));
            }
            if let Some(text) = response.text.strip_prefix("* BYE") {
                return Err(Error::Bye(text.trim().to_string()));
            }

            if let Some(message) = parse_fetch(&response)
                && message.uid > last_uid
            {
                messages.push(message);
            }
        }

        messages.sort_by_key(|m| m.uid);
        debug!(count = messages.len(), last_uid, "fetched new messages");
        Ok(messages)
    }
}

/// Parses an untagged `* <n> EXISTS` response.
fn parse_exists(text: &str) -> Option<u32> {
    let rest = text.strip_prefix("* ")?;
    let (count, keyword) = rest.split_once(' ')?;
    if keyword.trim() == "EXISTS" {
        count.parse().ok()
    } else {
        None
    }
}
