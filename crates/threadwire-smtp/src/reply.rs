//! SMTP reply parsing.

use crate::error::{Error, Result};

/// A parsed SMTP reply, possibly spanning several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g. 250).
    pub code: ReplyCode,
    /// Reply text lines, code and separator stripped.
    pub lines: Vec<String>,
}

impl Reply {
    /// Returns true for success replies (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// The reply text joined into one string.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Parses a reply from its raw lines.
    ///
    /// Multi-line replies use `250-...` continuations and a final
    /// `250 ...` line.
    ///
    /// # Errors
    ///
    /// Returns an error on an empty or malformed reply.
    pub fn parse(raw_lines: &[String]) -> Result<Self> {
        let first = raw_lines
            .first()
            .ok_or_else(|| Error::Protocol("empty reply".to_string()))?;
        if first.len() < 3 {
            return Err(Error::Protocol(format!("reply too short: {first}")));
        }

        let code = first[..3]
            .parse::<u16>()
            .map_err(|_| Error::Protocol(format!("invalid reply code: {first}")))?;

        let mut lines = Vec::with_capacity(raw_lines.len());
        for line in raw_lines {
            match line.len() {
                0..=2 => return Err(Error::Protocol(format!("malformed reply line: {line}"))),
                3 => lines.push(String::new()),
                _ => lines.push(line[4..].to_string()),
            }
        }

        Ok(Self {
            code: ReplyCode(code),
            lines,
        })
    }

    /// Returns true if `line` terminates a (possibly multi-line) reply.
    #[must_use]
    pub fn is_final_line(line: &str) -> bool {
        line.len() == 3 || (line.len() > 3 && line.as_bytes()[3] == b' ')
    }
}

/// An SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(pub u16);

impl ReplyCode {
    /// 221 Service closing transmission channel.
    pub const CLOSING: Self = Self(221);
    /// 354 Start mail input.
    pub const START_DATA: Self = Self(354);

    /// The numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true for success codes (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_line() {
        let reply = Reply::parse(&["250 OK".to_string()]).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.lines, vec!["OK"]);
        assert!(reply.is_success());
    }

    #[test]
    fn parses_multi_line() {
        let raw = vec![
            "250-smtp.example.com".to_string(),
            "250-STARTTLS".to_string(),
            "250 AUTH PLAIN LOGIN".to_string(),
        ];
        let reply = Reply::parse(&raw).unwrap();
        assert_eq!(reply.lines.len(), 3);
        assert_eq!(reply.lines[1], "STARTTLS");
    }

    #[test]
    fn parses_bare_code() {
        let reply = Reply::parse(&["250".to_string()]).unwrap();
        assert_eq!(reply.lines, vec![String::new()]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Reply::parse(&[]).is_err());
        assert!(Reply::parse(&["2".to_string()]).is_err());
        assert!(Reply::parse(&["ABC no".to_string()]).is_err());
    }

    #[test]
    fn detects_final_line() {
        assert!(Reply::is_final_line("250 done"));
        assert!(Reply::is_final_line("250"));
        assert!(!Reply::is_final_line("250-more"));
    }
}
