//! Literal-aware response framing.
//!
//! IMAP responses are CRLF-delimited lines, except that a line may end
//! with a literal announcement `{n}` followed by exactly `n` raw bytes and
//! the remainder of the line. [`FramedStream`] reassembles these into one
//! [`ResponseLine`] per protocol line.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// One reassembled protocol line with its literal payloads.
#[derive(Debug, Clone)]
pub struct ResponseLine {
    /// The protocol text, literal announcements left in place.
    pub text: String,
    /// Literal payloads, in the order announced.
    pub literals: Vec<Vec<u8>>,
}

/// Buffered reader/writer over an IMAP stream.
#[derive(Debug)]
pub struct FramedStream<S> {
    stream: S,
    buffer: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(8 * 1024),
        }
    }

    /// Writes a serialized command.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_command(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Reads one complete protocol line, consuming any announced
    /// literals.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection closes mid-response.
    pub async fn read_response(&mut self) -> Result<ResponseLine> {
        let mut text = String::new();
        let mut literals = Vec::new();

        loop {
            let segment = self.read_crlf_line().await?;
            let literal = literal_length(&segment);
            text.push_str(&segment);

            match literal {
                Some(len) => {
                    literals.push(self.read_exact_bytes(len).await?);
                    // The rest of the protocol line follows the literal.
                }
                None => return Ok(ResponseLine { text, literals }),
            }
        }
    }

    /// Reads up to and including the next CRLF, returning the line
    /// without its ending.
    async fn read_crlf_line(&mut self) -> Result<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line = self.buffer.split_to(pos + 1);
                // Drop "\n" and an optional preceding "\r".
                line.truncate(line.len() - 1);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            self.fill_buffer().await?;
        }
    }

    /// Reads exactly `len` bytes of literal payload.
    async fn read_exact_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        while self.buffer.len() < len {
            self.fill_buffer().await?;
        }
        let payload = self.buffer.split_to(len);
        Ok(payload.to_vec())
    }

    async fn fill_buffer(&mut self) -> Result<()> {
        let read = self.stream.read_buf(&mut self.buffer).await?;
        if read == 0 {
            return Err(Error::Parse("connection closed mid-response".to_string()));
        }
        Ok(())
    }
}

/// If `line` ends with a literal announcement `{n}`, returns `n`.
fn literal_length(line: &str) -> Option<usize> {
    let open = line.rfind('{')?;
    let inner = line.get(open + 1..line.len().checked_sub(1)?)?;
    if line.ends_with('}') {
        inner.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_simple_line() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut framed = FramedStream::new(client);

        server.write_all(b"* OK ready\r\n").await.unwrap();
        let response = framed.read_response().await.unwrap();
        assert_eq!(response.text, "* OK ready");
        assert!(response.literals.is_empty());
    }

    #[tokio::test]
    async fn reads_line_with_literal() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut framed = FramedStream::new(client);

        server
            .write_all(b"* 3 FETCH (UID 42 BODY[] {5}\r\nhello)\r\n")
            .await
            .unwrap();
        let response = framed.read_response().await.unwrap();
        assert_eq!(response.text, "* 3 FETCH (UID 42 BODY[] {5})");
        assert_eq!(response.literals, vec![b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn reads_literal_containing_crlf() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut framed = FramedStream::new(client);

        server
            .write_all(b"* 1 FETCH (BODY[] {10}\r\nab\r\ncd\r\nef)\r\n")
            .await
            .unwrap();
        let response = framed.read_response().await.unwrap();
        assert_eq!(response.literals, vec![b"ab\r\ncd\r\nef".to_vec()]);
    }

    #[tokio::test]
    async fn errors_on_eof() {
        let (client, server) = tokio::io::duplex(1024);
        drop(server);
        let mut framed = FramedStream::new(client);
        assert!(framed.read_response().await.is_err());
    }

    #[test]
    fn literal_length_parses() {
        assert_eq!(literal_length("* 1 FETCH (BODY[] {123}"), Some(123));
        assert_eq!(literal_length("* OK done"), None);
        assert_eq!(literal_length("{12"), None);
    }
}
