//! Raw message parsing.

use crate::encoding::{decode_base64, decode_quoted_printable, decode_rfc2047};
use crate::error::Result;
use crate::header::Headers;

/// Maximum multipart nesting depth we will follow.
const MAX_PART_DEPTH: usize = 8;

/// A parsed inbound mail message.
///
/// Only the fields the sync pipeline consumes are surfaced: threading
/// headers, sender, subject, and the text/html body alternatives.
#[derive(Debug, Clone)]
pub struct Mail {
    headers: Headers,
    body_text: Option<String>,
    body_html: Option<String>,
}

impl Mail {
    /// Parses a raw RFC 5322 message.
    ///
    /// Multipart bodies are walked (including nested
    /// `multipart/alternative`) and the first `text/plain` and `text/html`
    /// parts are kept. Part bodies are decoded according to their
    /// `Content-Transfer-Encoding`; a part that fails to decode is kept
    /// as-is rather than failing the message.
    ///
    /// # Errors
    ///
    /// Returns an error only if the header block is malformed beyond
    /// recovery.
    pub fn parse(raw: &str) -> Result<Self> {
        let (header_block, body) = split_message(raw);
        let headers = Headers::parse(header_block)?;

        let mut body_text = None;
        let mut body_html = None;
        collect_bodies(&headers, body, 0, &mut body_text, &mut body_html);

        Ok(Self {
            headers,
            body_text,
            body_html,
        })
    }

    /// The parsed header collection.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The `Message-ID` header value, trimmed.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id").map(str::trim)
    }

    /// The `In-Reply-To` header value, trimmed.
    ///
    /// When the header carries several ids, the first one is returned;
    /// that is the id of the message being replied to.
    #[must_use]
    pub fn in_reply_to(&self) -> Option<&str> {
        self.headers
            .get("in-reply-to")
            .and_then(|v| v.split_whitespace().next())
    }

    /// The raw `From` header value.
    #[must_use]
    pub fn from_addr(&self) -> Option<&str> {
        self.headers.get("from").map(str::trim)
    }

    /// The decoded `Subject` header.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers
            .get("subject")
            .map(|raw| decode_rfc2047(raw).unwrap_or_else(|_| raw.to_string()))
    }

    /// The `text/plain` body, if the message had one.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        self.body_text.as_deref()
    }

    /// The `text/html` body, if the message had one.
    #[must_use]
    pub fn body_html(&self) -> Option<&str> {
        self.body_html.as_deref()
    }
}

/// Splits a raw message into its header block and body at the first blank
/// line.
fn split_message(raw: &str) -> (&str, &str) {
    if let Some(idx) = raw.find("\r\n\r\n") {
        (&raw[..idx], &raw[idx + 4..])
    } else if let Some(idx) = raw.find("\n\n") {
        (&raw[..idx], &raw[idx + 2..])
    } else {
        (raw, "")
    }
}

/// Recursively walks a (possibly multipart) body, filling in the first
/// text and html alternatives found.
fn collect_bodies(
    headers: &Headers,
    body: &str,
    depth: usize,
    text: &mut Option<String>,
    html: &mut Option<String>,
) {
    if depth > MAX_PART_DEPTH {
        return;
    }

    let content_type = mime_type(headers);

    if content_type.starts_with("multipart/") {
        let Some(boundary) = boundary_param(headers) else {
            return;
        };
        for part in split_parts(body, &boundary) {
            let (part_headers, part_body) = split_message(&part);
            if let Ok(part_headers) = Headers::parse(part_headers) {
                collect_bodies(&part_headers, part_body, depth + 1, text, html);
            }
        }
        return;
    }

    let decoded = decode_body(headers, body);
    if content_type == "text/html" {
        if html.is_none() {
            *html = Some(decoded);
        }
    } else if text.is_none() {
        // text/plain, or an untyped single-part body
        *text = Some(decoded);
    }
}

/// The lowercased mime type from `Content-Type`, defaulting to
/// `text/plain`.
fn mime_type(headers: &Headers) -> String {
    headers
        .get("content-type")
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_lowercase())
        .unwrap_or_else(|| "text/plain".to_string())
}

/// Extracts the `boundary` parameter from `Content-Type`.
fn boundary_param(headers: &Headers) -> Option<String> {
    let value = headers.get("content-type")?;
    let lower = value.to_lowercase();
    let start = lower.find("boundary=")? + "boundary=".len();
    let rest = &value[start..];

    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        Some(quoted[..end].to_string())
    } else {
        let end = rest
            .find(|c: char| c.is_whitespace() || c == ';')
            .unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }
}

/// Splits a multipart body on its boundary delimiter, dropping the
/// preamble, epilogue, and closing delimiter.
fn split_parts(body: &str, boundary: &str) -> Vec<String> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut sections = body.split(delimiter.as_str());

    // Everything before the first delimiter is preamble.
    let _ = sections.next();

    for section in sections {
        // The closing delimiter leaves a leading "--".
        if section.starts_with("--") {
            break;
        }
        let trimmed = section.trim_start_matches("\r\n").trim_start_matches('\n');
        if !trimmed.trim().is_empty() {
            parts.push(trimmed.to_string());
        }
    }

    parts
}

/// Decodes a part body according to `Content-Transfer-Encoding`.
///
/// Unknown encodings and decode failures fall back to the raw body so a
/// single bad part cannot poison the message.
fn decode_body(headers: &Headers, body: &str) -> String {
    let encoding = headers
        .get("content-transfer-encoding")
        .unwrap_or("7bit")
        .trim()
        .to_lowercase();

    match encoding.as_str() {
        "base64" => decode_base64(body)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_else(|_| body.to_string()),
        "quoted-printable" => {
            decode_quoted_printable(body).unwrap_or_else(|_| body.to_string())
        }
        _ => body.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_part_text() {
        let raw = concat!(
            "From: Carol <carol@example.com>\r\n",
            "Message-ID: <m1@example.com>\r\n",
            "In-Reply-To: <t1@example.com>\r\n",
            "Subject: Re: Hello\r\n",
            "\r\n",
            "Thanks, sounds good!\r\n",
        );
        let mail = Mail::parse(raw).unwrap();
        assert_eq!(mail.message_id(), Some("<m1@example.com>"));
        assert_eq!(mail.in_reply_to(), Some("<t1@example.com>"));
        assert_eq!(mail.from_addr(), Some("Carol <carol@example.com>"));
        assert_eq!(mail.subject().as_deref(), Some("Re: Hello"));
        assert_eq!(mail.body_text(), Some("Thanks, sounds good!\r\n"));
        assert!(mail.body_html().is_none());
    }

    #[test]
    fn parse_single_part_html() {
        let raw = concat!(
            "Content-Type: text/html; charset=utf-8\r\n",
            "\r\n",
            "<p>Hi</p>\r\n",
        );
        let mail = Mail::parse(raw).unwrap();
        assert_eq!(mail.body_html(), Some("<p>Hi</p>\r\n"));
        assert!(mail.body_text().is_none());
    }

    #[test]
    fn parse_multipart_alternative() {
        let raw = concat!(
            "Content-Type: multipart/alternative; boundary=\"b1\"\r\n",
            "\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "plain version\r\n",
            "--b1\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>html version</p>\r\n",
            "--b1--\r\n",
        );
        let mail = Mail::parse(raw).unwrap();
        assert_eq!(mail.body_text().map(str::trim), Some("plain version"));
        assert_eq!(
            mail.body_html().map(str::trim),
            Some("<p>html version</p>")
        );
    }

    #[test]
    fn parse_nested_multipart() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=inner\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "nested plain\r\n",
            "--inner--\r\n",
            "--outer--\r\n",
        );
        let mail = Mail::parse(raw).unwrap();
        assert_eq!(mail.body_text().map(str::trim), Some("nested plain"));
    }

    #[test]
    fn parse_decodes_quoted_printable_part() {
        let raw = concat!(
            "Content-Type: text/plain\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "caf=C3=A9\r\n",
        );
        let mail = Mail::parse(raw).unwrap();
        assert_eq!(mail.body_text().map(str::trim), Some("café"));
    }

    #[test]
    fn parse_decodes_base64_part() {
        let raw = concat!(
            "Content-Type: text/plain\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "SGVsbG8gdGhlcmU=\r\n",
        );
        let mail = Mail::parse(raw).unwrap();
        assert_eq!(mail.body_text().map(str::trim), Some("Hello there"));
    }

    #[test]
    fn in_reply_to_takes_first_id() {
        let raw = "In-Reply-To: <a@x> <b@y>\r\n\r\nbody";
        let mail = Mail::parse(raw).unwrap();
        assert_eq!(mail.in_reply_to(), Some("<a@x>"));
    }

    #[test]
    fn missing_threading_headers_are_none() {
        let mail = Mail::parse("Subject: hi\r\n\r\nbody").unwrap();
        assert!(mail.message_id().is_none());
        assert!(mail.in_reply_to().is_none());
    }

    #[test]
    fn headerless_blob_is_all_body() {
        // No blank line separator at all: treated as headers-only; real
        // messages always carry at least one header.
        let mail = Mail::parse("just some text with no structure").unwrap();
        assert!(mail.message_id().is_none());
    }
}
