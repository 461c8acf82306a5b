//! The provider dispatcher: sends one outbound message and returns the
//! provider-assigned message identifier.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use threadwire_smtp::{Address, Client, connection};

use super::config::{HttpProvider, ProviderConfig, Security, SmtpProvider};

/// One outbound message to dispatch.
#[derive(Debug, Clone)]
pub struct Outbound {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body: String,
    /// `Message-ID` of the thread being replied to, if any.
    pub in_reply_to: Option<String>,
}

/// The result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// Provider-assigned message identifier; stored on the thread and
    /// matched against inbound `In-Reply-To` values.
    pub message_id: String,
}

/// Dispatch failures. These propagate to the send/reply caller; an email
/// that failed to dispatch never leaves a thread or reply row behind.
#[derive(Debug, Error)]
pub enum SendError {
    /// SMTP transport or protocol failure.
    #[error("SMTP dispatch failed: {0}")]
    Smtp(#[from] threadwire_smtp::Error),

    /// HTTP transport failure.
    #[error("HTTP dispatch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The HTTP provider answered with a non-success status.
    #[error("provider rejected the message ({status}): {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The HTTP provider's response carried no usable id.
    #[error("provider returned no message id")]
    MissingMessageId,
}

/// Sends outbound mail through whichever provider is configured.
///
/// The dispatcher never touches the thread store; persistence happens in
/// the service layer only after a successful return from [`send`].
///
/// [`send`]: Dispatcher::send
#[derive(Debug)]
pub struct Dispatcher {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl Dispatcher {
    /// Creates a dispatcher for the given provider configuration.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// The configured sender address.
    #[must_use]
    pub fn from_address(&self) -> &str {
        self.config.from_address()
    }

    /// Dispatches one message, returning the provider message id.
    ///
    /// # Errors
    ///
    /// Returns a [`SendError`] with provider detail on any failure; no
    /// error is swallowed.
    pub async fn send(&self, outbound: &Outbound) -> Result<Dispatched, SendError> {
        let dispatched = match &self.config {
            ProviderConfig::Smtp(cfg) => self.send_smtp(cfg, outbound).await?,
            ProviderConfig::Http(cfg) => self.send_http(cfg, outbound).await?,
        };
        info!(to = %outbound.to, message_id = %dispatched.message_id, "outbound dispatched");
        Ok(dispatched)
    }

    /// Relays through SMTP. The `Message-ID` is generated locally and
    /// stamped into the headers before DATA, the way nodemailer-style
    /// relays do it.
    async fn send_smtp(
        &self,
        cfg: &SmtpProvider,
        outbound: &Outbound,
    ) -> Result<Dispatched, SendError> {
        let from = Address::new(cfg.from.clone())?;
        let to = Address::new(outbound.to.clone())?;
        let message_id = generate_message_id(from.domain());
        let message = build_rfc5322(&cfg.from, outbound, &message_id);

        let stream = match cfg.security {
            Security::Tls => connection::connect_tls(&cfg.host, cfg.port).await?,
            Security::StartTls | Security::None => {
                connection::connect(&cfg.host, cfg.port).await?
            }
        };

        let client = Client::from_stream(stream).await?;
        let client = client.ehlo("localhost").await?;
        let client = if cfg.security == Security::StartTls {
            client.starttls(&cfg.host).await?
        } else {
            client
        };

        let client = client.auth_plain(&cfg.username, &cfg.password).await?;
        let client = client.mail_from(from).await?;
        let client = client.rcpt_to(to).await?;
        let client = client.data().await?;
        let client = client.send_message(message.as_bytes()).await?;
        client.quit().await?;

        Ok(Dispatched { message_id })
    }

    /// Relays through the transactional HTTP API.
    async fn send_http(
        &self,
        cfg: &HttpProvider,
        outbound: &Outbound,
    ) -> Result<Dispatched, SendError> {
        let payload = HttpSendRequest {
            from: &cfg.from,
            to: std::slice::from_ref(&outbound.to),
            subject: &outbound.subject,
            html: &outbound.body,
            headers: outbound
                .in_reply_to
                .as_deref()
                .map(|id| HttpHeaders { in_reply_to: id }),
        };

        let response = self
            .http
            .post(&cfg.endpoint)
            .bearer_auth(&cfg.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SendError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: HttpSendResponse = response.json().await?;
        if body.id.is_empty() {
            return Err(SendError::MissingMessageId);
        }
        debug!(provider_id = %body.id, "http provider accepted");
        Ok(Dispatched { message_id: body.id })
    }
}

#[derive(Serialize)]
struct HttpSendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<HttpHeaders<'a>>,
}

#[derive(Serialize)]
struct HttpHeaders<'a> {
    #[serde(rename = "In-Reply-To")]
    in_reply_to: &'a str,
}

#[derive(Deserialize)]
struct HttpSendResponse {
    #[serde(default)]
    id: String,
}

/// Generates a unique `Message-ID` for the sender domain.
fn generate_message_id(domain: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!(
        "<{}.{:06}.{count}@{domain}>",
        now.as_secs(),
        now.subsec_micros()
    )
}

/// Assembles the RFC 5322 message for SMTP dispatch.
fn build_rfc5322(from: &str, outbound: &Outbound, message_id: &str) -> String {
    let mut message = String::new();
    let _ = write!(message, "From: {from}\r\n");
    let _ = write!(message, "To: {}\r\n", outbound.to);
    let _ = write!(message, "Subject: {}\r\n", outbound.subject);
    let _ = write!(message, "Message-ID: {message_id}\r\n");
    let _ = write!(
        message,
        "Date: {}\r\n",
        chrono::Utc::now().to_rfc2822()
    );
    if let Some(in_reply_to) = &outbound.in_reply_to {
        let _ = write!(message, "In-Reply-To: {in_reply_to}\r\n");
        let _ = write!(message, "References: {in_reply_to}\r\n");
    }
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str("Content-Type: text/html; charset=utf-8\r\n");
    message.push_str("Content-Transfer-Encoding: 8bit\r\n");
    message.push_str("\r\n");
    message.push_str(&outbound.body);
    message
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn outbound(in_reply_to: Option<&str>) -> Outbound {
        Outbound {
            to: "buyer@acme.test".to_string(),
            subject: "Hello".to_string(),
            body: "<p>Hi there</p>".to_string(),
            in_reply_to: in_reply_to.map(str::to_string),
        }
    }

    #[test]
    fn message_ids_are_unique_and_bracketed() {
        let a = generate_message_id("example.com");
        let b = generate_message_id("example.com");
        assert!(a.starts_with('<') && a.ends_with("@example.com>"));
        assert_ne!(a, b);
    }

    #[test]
    fn rfc5322_carries_threading_headers_on_replies() {
        let message = build_rfc5322("crm@example.com", &outbound(Some("<t1@wire>")), "<m1@ex>");
        assert!(message.contains("From: crm@example.com\r\n"));
        assert!(message.contains("Message-ID: <m1@ex>\r\n"));
        assert!(message.contains("In-Reply-To: <t1@wire>\r\n"));
        assert!(message.contains("References: <t1@wire>\r\n"));
        assert!(message.ends_with("\r\n\r\n<p>Hi there</p>"));
    }

    #[test]
    fn rfc5322_omits_threading_headers_on_new_threads() {
        let message = build_rfc5322("crm@example.com", &outbound(None), "<m1@ex>");
        assert!(!message.contains("In-Reply-To"));
        assert!(!message.contains("References"));
    }

    #[test]
    fn http_payload_shape() {
        let out = outbound(Some("<t1@wire>"));
        let payload = HttpSendRequest {
            from: "crm@example.com",
            to: std::slice::from_ref(&out.to),
            subject: &out.subject,
            html: &out.body,
            headers: out
                .in_reply_to
                .as_deref()
                .map(|id| HttpHeaders { in_reply_to: id }),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["to"][0], "buyer@acme.test");
        assert_eq!(json["headers"]["In-Reply-To"], "<t1@wire>");
    }

    #[test]
    fn http_payload_omits_headers_for_new_threads() {
        let out = outbound(None);
        let payload = HttpSendRequest {
            from: "crm@example.com",
            to: std::slice::from_ref(&out.to),
            subject: &out.subject,
            html: &out.body,
            headers: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("headers").is_none());
    }
}
