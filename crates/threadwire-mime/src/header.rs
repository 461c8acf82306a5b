//! RFC 822 header handling.

use crate::error::Result;

/// An ordered collection of mail headers with case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value, preserving insertion order.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into().to_lowercase(), value.into()));
    }

    /// Returns the first value for a header, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns the number of header entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a raw header block, unfolding continuation lines.
    ///
    /// Continuation lines (starting with space or tab) are joined onto the
    /// previous header with a single space, per RFC 822 folding rules.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; lines without a colon are ignored
    /// rather than rejected, matching how real-world mail is parsed.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut headers = Self::new();
        let mut pending: Option<(String, String)> = None;

        for line in raw.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = pending.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = pending.take() {
                headers.add(name, value.trim().to_string());
            }

            if let Some((name, value)) = line.split_once(':') {
                pending = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = pending {
            headers.add(name, value.trim().to_string());
        }

        Ok(headers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_headers() {
        let raw = concat!(
            "From: alice@example.com\r\n",
            "To: bob@example.com\r\n",
            "Subject: Greetings\r\n",
            "\r\n",
        );
        let headers = Headers::parse(raw).unwrap();
        assert_eq!(headers.get("from"), Some("alice@example.com"));
        assert_eq!(headers.get("Subject"), Some("Greetings"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn parse_unfolds_continuations() {
        let raw = concat!(
            "Content-Type: multipart/alternative;\r\n",
            " boundary=\"abc123\"\r\n",
            "\r\n",
        );
        let headers = Headers::parse(raw).unwrap();
        assert_eq!(
            headers.get("content-type"),
            Some("multipart/alternative; boundary=\"abc123\"")
        );
    }

    #[test]
    fn parse_stops_at_blank_line() {
        let raw = "Subject: hi\r\n\r\nFrom: not-a-header\r\n";
        let headers = Headers::parse(raw).unwrap();
        assert_eq!(headers.get("subject"), Some("hi"));
        assert!(headers.get("from").is_none());
    }

    #[test]
    fn get_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Message-ID", "<x@y>");
        assert_eq!(headers.get("message-id"), Some("<x@y>"));
        assert_eq!(headers.get("MESSAGE-ID"), Some("<x@y>"));
    }

    #[test]
    fn get_all_returns_every_value() {
        let mut headers = Headers::new();
        headers.add("Received", "hop one");
        headers.add("Received", "hop two");
        assert_eq!(headers.get_all("received").len(), 2);
        assert_eq!(headers.get("received"), Some("hop one"));
    }
}
