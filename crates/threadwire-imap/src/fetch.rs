//! FETCH response parsing.

use crate::connection::ResponseLine;

/// One fetched message: its UID and full raw source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Mailbox UID of the message.
    pub uid: u32,
    /// Raw RFC 5322 source (the `BODY[]` literal).
    pub body: Vec<u8>,
}

/// Parses an untagged FETCH response carrying `UID` and a `BODY[]`
/// literal, e.g. `* 12 FETCH (UID 457 BODY[] {1234})`.
///
/// Returns `None` for any other untagged response (EXISTS, RECENT, FLAGS
/// updates, and FETCH responses without a body literal).
pub(crate) fn parse_fetch(response: &ResponseLine) -> Option<FetchedMessage> {
    let text = response.text.strip_prefix("* ")?;
    let (_, rest) = text.split_once(' ')?;
    if !rest.starts_with("FETCH ") {
        return None;
    }

    let uid = extract_uid(rest)?;
    let body = response.literals.first()?.clone();
    Some(FetchedMessage { uid, body })
}

/// Finds the number following the `UID` token.
fn extract_uid(text: &str) -> Option<u32> {
    let mut tokens = text
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter(|t| !t.is_empty());

    while let Some(token) = tokens.next() {
        if token == "UID" {
            return tokens.next()?.parse().ok();
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(text: &str, literals: Vec<Vec<u8>>) -> ResponseLine {
        ResponseLine {
            text: text.to_string(),
            literals,
        }
    }

    #[test]
    fn parses_fetch_with_uid_and_body() {
        let response = line("* 12 FETCH (UID 457 BODY[] {4})", vec![b"mail".to_vec()]);
        let message = parse_fetch(&response).unwrap();
        assert_eq!(message.uid, 457);
        assert_eq!(message.body, b"mail");
    }

    #[test]
    fn parses_uid_after_body_item() {
        let response = line("* 2 FETCH (BODY[] {3} UID 9)", vec![b"abc".to_vec()]);
        assert_eq!(parse_fetch(&response).unwrap().uid, 9);
    }

    #[test]
    fn ignores_non_fetch_responses() {
        assert!(parse_fetch(&line("* 3 EXISTS", vec![])).is_none());
        assert!(parse_fetch(&line("* OK still here", vec![])).is_none());
    }

    #[test]
    fn ignores_fetch_without_literal() {
        let response = line("* 5 FETCH (UID 77 FLAGS (\\Seen))", vec![]);
        assert!(parse_fetch(&response).is_none());
    }

    #[test]
    fn ignores_fetch_without_uid() {
        let response = line("* 5 FETCH (BODY[] {2})", vec![b"ab".to_vec()]);
        assert!(parse_fetch(&response).is_none());
    }
}
