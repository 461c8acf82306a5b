//! Type-state SMTP client.

use std::marker::PhantomData;

use base64::Engine;
use tracing::debug;

use super::{ServerInfo, SmtpStream};
use crate::address::Address;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::reply::{Reply, ReplyCode};

/// Type-state marker: connected, not yet authenticated.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: authenticated.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker: mail transaction opened.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker: at least one recipient accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker: DATA accepted, message content expected.
#[derive(Debug)]
pub struct Data;

/// SMTP client; the `State` parameter encodes the protocol phase.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    info: ServerInfo,
    _state: PhantomData<State>,
}

impl<S> Client<S> {
    /// Capabilities discovered from the EHLO response.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.info
    }

    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            info: self.info,
            _state: PhantomData,
        }
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        self.stream.write_all(&cmd.serialize()).await?;
        Self::read_reply(&mut self.stream).await
    }

    async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = stream.read_line().await?;
            if line.is_empty() {
                continue;
            }
            let done = Reply::is_final_line(&line);
            lines.push(line);
            if done {
                break;
            }
        }
        Reply::parse(&lines)
    }

    fn expect_success(reply: &Reply) -> Result<()> {
        if reply.is_success() {
            Ok(())
        } else {
            Err(Error::rejected(reply.code.as_u16(), reply.text()))
        }
    }

    /// Sends QUIT and closes the connection; valid in any state.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT exchange fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::rejected(reply.code.as_u16(), reply.text()));
        }
        Ok(())
    }
}

impl Client<Connected> {
    /// Wraps a connected stream and consumes the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting is missing or negative.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = Self::read_reply(&mut stream).await?;
        Self::expect_success(&greeting)?;

        let hostname = greeting
            .lines
            .first()
            .and_then(|l| l.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records advertised capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the greeting.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(&Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;
        Self::expect_success(&reply)?;
        self.record_capabilities(&reply);
        Ok(self)
    }

    /// Upgrades the connection with STARTTLS and re-issues EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS was not offered or the handshake
    /// fails.
    pub async fn starttls(mut self, hostname: &str) -> Result<Self> {
        if !self.info.starttls {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.send_command(&Command::StartTls).await?;
        Self::expect_success(&reply)?;

        self.stream = self.stream.upgrade_to_tls(hostname).await?;

        // Capabilities must be rediscovered on the encrypted channel.
        let reply = self
            .send_command(&Command::Ehlo {
                hostname: hostname.to_string(),
            })
            .await?;
        Self::expect_success(&reply)?;
        self.record_capabilities(&reply);
        Ok(self)
    }

    /// Authenticates with AUTH PLAIN.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let credentials = format!("\0{username}\0{password}");
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());

        let reply = self
            .send_command(&Command::AuthPlain {
                initial_response: encoded,
            })
            .await?;
        Self::expect_success(&reply)?;
        Ok(self.transition())
    }

    fn record_capabilities(&mut self, reply: &Reply) {
        // First line repeats the hostname; the rest are extensions.
        for line in reply.lines.iter().skip(1) {
            let upper = line.to_uppercase();
            if upper == "STARTTLS" {
                self.info.starttls = true;
            } else if upper.starts_with("AUTH") && upper.contains("PLAIN") {
                self.info.auth_plain = true;
            }
        }
    }
}

impl Client<Authenticated> {
    /// Opens a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the sender.
    pub async fn mail_from(mut self, from: Address) -> Result<Client<MailTransaction>> {
        let reply = self.send_command(&Command::MailFrom { from }).await?;
        Self::expect_success(&reply)?;
        Ok(self.transition())
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        let reply = self.send_command(&Command::RcptTo { to }).await?;
        Self::expect_success(&reply)?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        let reply = self.send_command(&Command::RcptTo { to }).await?;
        Self::expect_success(&reply)?;
        Ok(self)
    }

    /// Begins message content transmission.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not invite data.
    pub async fn data(mut self) -> Result<Client<Data>> {
        let reply = self.send_command(&Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(Error::rejected(reply.code.as_u16(), reply.text()));
        }
        Ok(self.transition())
    }
}

impl Client<Data> {
    /// Transmits an RFC 5322 message and completes the transaction.
    ///
    /// Line endings are normalized to CRLF and leading dots are stuffed;
    /// the terminating `.` line is appended automatically.
    ///
    /// # Errors
    ///
    /// Returns an error if transmission fails or the server rejects the
    /// message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Authenticated>> {
        for raw_line in message.split(|&b| b == b'\n') {
            let line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);
            if line.first() == Some(&b'.') {
                self.stream.write_all(b".").await?;
            }
            self.stream.write_all(line).await?;
            self.stream.write_all(b"\r\n").await?;
        }
        self.stream.write_all(b".\r\n").await?;

        let reply = Self::read_reply(&mut self.stream).await?;
        Self::expect_success(&reply)?;
        debug!(code = %reply.code, "message accepted");
        Ok(self.transition())
    }
}
