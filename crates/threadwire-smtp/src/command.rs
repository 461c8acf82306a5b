//! SMTP command serialization.

use crate::address::Address;

/// An SMTP command the client can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - extended greeting.
    Ehlo {
        /// Client hostname.
        hostname: String,
    },
    /// STARTTLS - upgrade to TLS.
    StartTls,
    /// AUTH PLAIN with a pre-encoded initial response.
    AuthPlain {
        /// Base64-encoded `\0user\0password`.
        initial_response: String,
    },
    /// MAIL FROM - open a mail transaction.
    MailFrom {
        /// Envelope sender.
        from: Address,
    },
    /// RCPT TO - add a recipient.
    RcptTo {
        /// Envelope recipient.
        to: Address,
    },
    /// DATA - begin message content.
    Data,
    /// QUIT - close the connection.
    Quit,
}

impl Command {
    /// Serializes the command line, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::AuthPlain { initial_response } => format!("AUTH PLAIN {initial_response}"),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        };
        format!("{line}\r\n").into_bytes()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serializes_ehlo() {
        let cmd = Command::Ehlo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO client.example.com\r\n");
    }

    #[test]
    fn serializes_mail_from_with_brackets() {
        let cmd = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<sender@example.com>\r\n");
    }

    #[test]
    fn serializes_rcpt_to() {
        let cmd = Command::RcptTo {
            to: Address::new("rcpt@example.com").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"RCPT TO:<rcpt@example.com>\r\n");
    }

    #[test]
    fn serializes_auth_plain() {
        let cmd = Command::AuthPlain {
            initial_response: "AHVzZXIAcGFzcw==".to_string(),
        };
        assert_eq!(cmd.serialize(), b"AUTH PLAIN AHVzZXIAcGFzcw==\r\n");
    }

    #[test]
    fn serializes_bare_commands() {
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }
}
