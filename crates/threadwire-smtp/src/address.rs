//! SMTP envelope addresses.

use crate::error::{Error, Result};

/// A validated SMTP envelope address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address(String);

impl Address {
    /// Validates and wraps an address.
    ///
    /// The validation is deliberately loose (one `@`, non-empty local and
    /// domain parts, no whitespace or angle brackets); the receiving
    /// server applies the authoritative rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the shape is unusable in an
    /// SMTP envelope.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let valid = addr.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && (domain.contains('.') || domain == "localhost")
        });

        if !valid || addr.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
            return Err(Error::InvalidAddress(addr));
        }
        Ok(Self(addr))
    }

    /// The address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The domain part of the address.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn accepts_localhost() {
        assert!(Address::new("dev@localhost").is_ok());
    }

    #[test]
    fn rejects_missing_at() {
        assert!(Address::new("nobody").is_err());
    }

    #[test]
    fn rejects_whitespace_and_brackets() {
        assert!(Address::new("a b@example.com").is_err());
        assert!(Address::new("<user@example.com>").is_err());
    }

    #[test]
    fn rejects_empty_local_part() {
        assert!(Address::new("@example.com").is_err());
    }
}
