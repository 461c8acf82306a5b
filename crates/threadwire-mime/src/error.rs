//! Error types for mail parsing.

use std::string::FromUtf8Error;

/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Mail parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed header block.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Invalid transfer encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// Message could not be split into headers and body.
    #[error("Parse error: {0}")]
    Parse(String),
}
