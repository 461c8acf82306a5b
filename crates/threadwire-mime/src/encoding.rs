//! Transfer-encoding decode utilities.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Decodes Base64 data, ignoring embedded whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact).map_err(Into::into)
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// Soft line breaks (`=` at end of line) are removed; `=XX` escapes are
/// decoded to the corresponding byte.
///
/// # Errors
///
/// Returns an error if an escape sequence is malformed or the decoded
/// bytes are not valid UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let mut out = Vec::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'=' {
            // Soft break: "=\r\n" or "=\n"
            if bytes.get(i + 1) == Some(&b'\r') && bytes.get(i + 2) == Some(&b'\n') {
                i += 3;
                continue;
            }
            if bytes.get(i + 1) == Some(&b'\n') {
                i += 2;
                continue;
            }
            let hex = bytes
                .get(i + 1..i + 3)
                .ok_or_else(|| Error::InvalidEncoding("truncated escape".to_string()))?;
            let hex = std::str::from_utf8(hex)
                .map_err(|_| Error::InvalidEncoding("non-ASCII escape".to_string()))?;
            let decoded = u8::from_str_radix(hex, 16)
                .map_err(|e| Error::InvalidEncoding(format!("bad hex escape: {e}")))?;
            out.push(decoded);
            i += 3;
        } else {
            out.push(b);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(Into::into)
}

/// Decodes an RFC 2047 encoded-word header value.
///
/// Values not in `=?charset?enc?text?=` form are returned unchanged.
///
/// # Errors
///
/// Returns an error if the encoded-word is malformed.
pub fn decode_rfc2047(value: &str) -> Result<String> {
    let Some(inner) = value
        .strip_prefix("=?")
        .and_then(|rest| rest.strip_suffix("?="))
    else {
        return Ok(value.to_string());
    };

    let mut parts = inner.splitn(3, '?');
    let _charset = parts
        .next()
        .ok_or_else(|| Error::InvalidEncoding("missing charset".to_string()))?;
    let encoding = parts
        .next()
        .ok_or_else(|| Error::InvalidEncoding("missing encoding".to_string()))?;
    let payload = parts
        .next()
        .ok_or_else(|| Error::InvalidEncoding("missing payload".to_string()))?;

    match encoding.to_ascii_uppercase().as_str() {
        "B" => {
            let decoded = decode_base64(payload)?;
            String::from_utf8(decoded).map_err(Into::into)
        }
        "Q" => decode_quoted_printable(&payload.replace('_', " ")),
        other => Err(Error::InvalidEncoding(format!(
            "unknown encoded-word encoding: {other}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base64_roundtrip() {
        assert_eq!(decode_base64("SGVsbG8=").unwrap(), b"Hello");
    }

    #[test]
    fn base64_tolerates_line_breaks() {
        assert_eq!(decode_base64("SGVs\r\nbG8=").unwrap(), b"Hello");
    }

    #[test]
    fn quoted_printable_plain_passthrough() {
        assert_eq!(
            decode_quoted_printable("Hello, World!").unwrap(),
            "Hello, World!"
        );
    }

    #[test]
    fn quoted_printable_escapes() {
        assert_eq!(decode_quoted_printable("H=C3=A9llo").unwrap(), "Héllo");
    }

    #[test]
    fn quoted_printable_soft_break() {
        assert_eq!(decode_quoted_printable("Hel=\r\nlo").unwrap(), "Hello");
    }

    #[test]
    fn quoted_printable_rejects_truncated_escape() {
        assert!(decode_quoted_printable("oops=4").is_err());
    }

    #[test]
    fn rfc2047_base64_word() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
    }

    #[test]
    fn rfc2047_q_word_with_underscores() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?a_b?=").unwrap(), "a b");
    }

    #[test]
    fn rfc2047_passthrough() {
        assert_eq!(decode_rfc2047("plain subject").unwrap(), "plain subject");
    }
}
