//! Outbound provider configuration.
//!
//! A closed enum rather than a provider-type string: an unsupported
//! provider is unrepresentable, and match sites are checked for
//! exhaustiveness at compile time.

use serde::Deserialize;

/// Connection security for SMTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Security {
    /// No encryption (test servers only).
    None,
    /// Implicit TLS (port 465).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect (port 587).
    StartTls,
}

/// SMTP relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpProvider {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Username for AUTH PLAIN.
    pub username: String,
    /// Password for AUTH PLAIN.
    pub password: String,
    /// Sender address stamped on outbound mail.
    pub from: String,
}

/// Transactional HTTP API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpProvider {
    /// Send endpoint, e.g. `https://api.provider.test/emails`.
    pub endpoint: String,
    /// Bearer token.
    pub api_key: String,
    /// Sender address stamped on outbound mail.
    pub from: String,
}

/// The active outbound provider.
///
/// Credentials are injected here at construction; nothing in the
/// dispatch path reads ambient or hard-coded configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Relay through an SMTP server.
    Smtp(SmtpProvider),
    /// Relay through a transactional HTTP API.
    Http(HttpProvider),
}

impl ProviderConfig {
    /// The sender address for the active provider.
    #[must_use]
    pub fn from_address(&self) -> &str {
        match self {
            Self::Smtp(cfg) => &cfg.from,
            Self::Http(cfg) => &cfg.from,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_smtp_config() {
        let json = r#"{
            "type": "smtp",
            "host": "smtp.example.com",
            "port": 465,
            "security": "Tls",
            "username": "mailer",
            "password": "secret",
            "from": "crm@example.com"
        }"#;
        let config: ProviderConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config, ProviderConfig::Smtp(_)));
        assert_eq!(config.from_address(), "crm@example.com");
    }

    #[test]
    fn deserializes_tagged_http_config() {
        let json = r#"{
            "type": "http",
            "endpoint": "https://api.provider.test/emails",
            "api_key": "key",
            "from": "crm@example.com"
        }"#;
        let config: ProviderConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config, ProviderConfig::Http(_)));
    }

    #[test]
    fn unknown_provider_type_is_rejected() {
        let json = r#"{"type": "carrier_pigeon", "from": "x@y.test"}"#;
        assert!(serde_json::from_str::<ProviderConfig>(json).is_err());
    }
}
