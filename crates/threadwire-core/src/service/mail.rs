//! Send, reply, and history operations.
//!
//! Dispatch strictly precedes persistence: a thread or reply row is
//! created only after the provider accepted the message, so a failed
//! dispatch never leaves partial state behind.

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::Database;
use crate::dispatch::{Dispatch, Outbound, SendError};
use crate::thread::{
    CustomerId, EmailReply, EmailThread, NewReply, NewThread, Page, ThreadId, ThreadStats,
    ThreadWithReplies,
};

/// Request body of `POST /mail/send`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailRequest {
    /// Internal id of the sending user.
    pub sender_id: String,
    /// Target customer.
    pub customer_id: CustomerId,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body: String,
}

/// Request body of `POST /mail/reply`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyRequest {
    /// Thread being replied to.
    pub thread_id: ThreadId,
    /// HTML body of the reply.
    pub reply_body: String,
}

/// Failures surfaced to the mail endpoints.
#[derive(Debug, Error)]
pub enum MailServiceError {
    /// A required field was blank.
    #[error("missing required field: {0}")]
    InvalidInput(&'static str),

    /// The target customer does not exist.
    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// The target thread does not exist.
    #[error("email thread not found: {0}")]
    ThreadNotFound(ThreadId),

    /// The provider refused or failed the dispatch.
    #[error(transparent)]
    Send(#[from] SendError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] crate::Error),
}

impl MailServiceError {
    /// The HTTP status the (out-of-scope) REST layer maps this to.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::CustomerNotFound(_) | Self::ThreadNotFound(_) => 404,
            Self::Send(_) => 502,
            Self::Store(_) => 500,
        }
    }
}

/// Mail operations over the thread store and the configured dispatcher.
#[derive(Debug)]
pub struct MailService<D> {
    db: Database,
    dispatcher: D,
}

impl<D: Dispatch> MailService<D> {
    /// Creates the service.
    #[must_use]
    pub const fn new(db: Database, dispatcher: D) -> Self {
        Self { db, dispatcher }
    }

    /// Sends a new outbound email and creates its thread.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on blank fields, `CustomerNotFound` on an unknown
    /// customer, `Send` if the provider fails (no thread is created),
    /// `Store` on persistence failure.
    pub async fn send_email(
        &self,
        request: &SendEmailRequest,
    ) -> Result<EmailThread, MailServiceError> {
        if request.sender_id.trim().is_empty() {
            return Err(MailServiceError::InvalidInput("sender_id"));
        }
        if request.subject.trim().is_empty() {
            return Err(MailServiceError::InvalidInput("subject"));
        }
        if request.body.trim().is_empty() {
            return Err(MailServiceError::InvalidInput("body"));
        }

        let customer = self
            .db
            .customers()
            .find(request.customer_id)
            .await?
            .ok_or(MailServiceError::CustomerNotFound(request.customer_id))?;

        let dispatched = self
            .dispatcher
            .send(&Outbound {
                to: customer.email,
                subject: request.subject.trim().to_string(),
                body: request.body.trim().to_string(),
                in_reply_to: None,
            })
            .await?;

        let thread = self
            .db
            .threads()
            .create(&NewThread {
                customer_id: request.customer_id,
                subject: request.subject.trim().to_string(),
                body: request.body.trim().to_string(),
                sent_by: request.sender_id.clone(),
                message_id: dispatched.message_id,
            })
            .await?;

        info!(thread_id = %thread.id, customer_id = %thread.customer_id, "thread created");
        Ok(thread)
    }

    /// Sends an outbound reply on an existing thread and records it.
    ///
    /// The dispatch carries `In-Reply-To` set to the thread's
    /// `message_id`, and the stored reply flips the thread to `replied`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on a blank body, `ThreadNotFound` /
    /// `CustomerNotFound` on missing records, `Send` if the provider
    /// fails (nothing is stored), `Store` on persistence failure.
    pub async fn reply_to_thread(
        &self,
        request: &ReplyRequest,
    ) -> Result<EmailReply, MailServiceError> {
        if request.reply_body.trim().is_empty() {
            return Err(MailServiceError::InvalidInput("reply_body"));
        }

        let thread = self
            .db
            .threads()
            .find(request.thread_id)
            .await?
            .ok_or(MailServiceError::ThreadNotFound(request.thread_id))?;

        let customer = self
            .db
            .customers()
            .find(thread.customer_id)
            .await?
            .ok_or(MailServiceError::CustomerNotFound(thread.customer_id))?;

        let dispatched = self
            .dispatcher
            .send(&Outbound {
                to: customer.email,
                subject: format!("Re: {}", thread.subject),
                body: request.reply_body.trim().to_string(),
                in_reply_to: Some(thread.message_id.clone()),
            })
            .await?;

        let reply = self
            .db
            .threads()
            .append_reply(&NewReply {
                thread_id: thread.id,
                customer_id: thread.customer_id,
                reply_body: request.reply_body.trim().to_string(),
                sender_email: self.dispatcher.from_address().to_string(),
                message_id: dispatched.message_id,
                in_reply_to: thread.message_id,
            })
            .await?;

        info!(thread_id = %thread.id, reply_id = reply.id.0, "outbound reply recorded");
        Ok(reply)
    }

    /// All threads and replies for one customer (`GET
    /// /mail/thread/:customerId`).
    ///
    /// # Errors
    ///
    /// Returns `Store` on query failure.
    pub async fn communication_history(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<ThreadWithReplies>, MailServiceError> {
        Ok(self.db.threads().list_for_customer(customer_id).await?)
    }

    /// Paged thread listing for the mail overview.
    ///
    /// # Errors
    ///
    /// Returns `Store` on query failure.
    pub async fn list_threads(
        &self,
        page: u32,
        per_page: u32,
        customer: Option<CustomerId>,
    ) -> Result<(Vec<EmailThread>, Page), MailServiceError> {
        Ok(self.db.threads().list_paged(page, per_page, customer).await?)
    }

    /// Aggregate counts for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `Store` on query failure.
    pub async fn email_stats(&self) -> Result<ThreadStats, MailServiceError> {
        Ok(self.db.threads().stats().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dispatch::Dispatched;
    use crate::thread::ThreadStatus;
    use std::sync::Mutex;

    /// Records outbound messages; fails on demand.
    struct FakeDispatcher {
        sent: Mutex<Vec<Outbound>>,
        fail: bool,
    }

    impl FakeDispatcher {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    impl Dispatch for FakeDispatcher {
        async fn send(&self, outbound: &Outbound) -> Result<Dispatched, SendError> {
            if self.fail {
                return Err(SendError::Provider {
                    status: 500,
                    message: "relay down".to_string(),
                });
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(outbound.clone());
            Ok(Dispatched {
                message_id: format!("<out-{}@wire>", sent.len()),
            })
        }

        fn from_address(&self) -> &str {
            "crm@example.com"
        }
    }

    async fn service_with_customer() -> (MailService<FakeDispatcher>, CustomerId) {
        let db = Database::in_memory().await.unwrap();
        let customer = db.customers().create("Acme", "buyer@acme.test").await.unwrap();
        (MailService::new(db, FakeDispatcher::new()), customer.id)
    }

    fn send_request(customer_id: CustomerId) -> SendEmailRequest {
        SendEmailRequest {
            sender_id: "user-1".to_string(),
            customer_id,
            subject: "Hello".to_string(),
            body: "Hi there".to_string(),
        }
    }

    #[tokio::test]
    async fn send_creates_thread_after_dispatch() {
        let (service, customer_id) = service_with_customer().await;

        let thread = service.send_email(&send_request(customer_id)).await.unwrap();
        assert_eq!(thread.status, ThreadStatus::Sent);
        assert_eq!(thread.message_id, "<out-1@wire>");

        let sent = service.dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "buyer@acme.test");
        assert!(sent[0].in_reply_to.is_none());
    }

    #[tokio::test]
    async fn send_validates_fields() {
        let (service, customer_id) = service_with_customer().await;

        let mut request = send_request(customer_id);
        request.subject = "  ".to_string();
        let err = service.send_email(&request).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn send_rejects_unknown_customer() {
        let (service, _) = service_with_customer().await;

        let err = service
            .send_email(&send_request(CustomerId(404)))
            .await
            .unwrap_err();
        assert!(matches!(err, MailServiceError::CustomerNotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn failed_dispatch_creates_no_thread() {
        let db = Database::in_memory().await.unwrap();
        let customer = db.customers().create("Acme", "buyer@acme.test").await.unwrap();
        let service = MailService::new(db.clone(), FakeDispatcher::failing());

        let err = service.send_email(&send_request(customer.id)).await.unwrap_err();
        assert!(matches!(err, MailServiceError::Send(_)));

        let (threads, page) = db.threads().list_paged(1, 10, None).await.unwrap();
        assert!(threads.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn reply_dispatches_with_in_reply_to_and_flips_status() {
        let (service, customer_id) = service_with_customer().await;
        let thread = service.send_email(&send_request(customer_id)).await.unwrap();

        let reply = service
            .reply_to_thread(&ReplyRequest {
                thread_id: thread.id,
                reply_body: "Following up".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reply.in_reply_to, thread.message_id);
        assert_eq!(reply.sender_email, "crm@example.com");

        {
            let sent = service.dispatcher.sent.lock().unwrap();
            assert_eq!(sent[1].subject, "Re: Hello");
            assert_eq!(sent[1].in_reply_to.as_deref(), Some(thread.message_id.as_str()));
        }

        let history = service.communication_history(customer_id).await.unwrap();
        assert_eq!(history[0].thread.status, ThreadStatus::Replied);
        assert_eq!(history[0].replies.len(), 1);
    }

    #[tokio::test]
    async fn reply_to_unknown_thread_is_not_found() {
        let (service, _) = service_with_customer().await;

        let err = service
            .reply_to_thread(&ReplyRequest {
                thread_id: ThreadId(999),
                reply_body: "hello".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MailServiceError::ThreadNotFound(_)));
    }
}
