//! Thread and reply models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an email thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub i64);

/// Unique identifier for a stored reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplyId(pub i64);

/// Identifier of a CRM customer (external collaborator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub i64);

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a thread. Transitions only move forward:
/// `Sent → Replied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    /// Outbound email dispatched, no reply yet.
    Sent,
    /// At least one inbound reply has been matched.
    Replied,
}

impl ThreadStatus {
    /// The column value for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Replied => "replied",
        }
    }

    /// Parses a column value; unknown values are treated as `Sent` so a
    /// corrupt row cannot poison reads.
    #[must_use]
    pub fn from_column(value: &str) -> Self {
        if value == "replied" { Self::Replied } else { Self::Sent }
    }
}

/// One outbound conversation root.
#[derive(Debug, Clone, Serialize)]
pub struct EmailThread {
    /// Unique identifier.
    pub id: ThreadId,
    /// Customer the thread belongs to.
    pub customer_id: CustomerId,
    /// Subject of the outbound email.
    pub subject: String,
    /// Body of the outbound email.
    pub body: String,
    /// Internal user who sent it.
    pub sent_by: String,
    /// Provider-assigned `Message-ID`; unique, the reply-matching key.
    pub message_id: String,
    /// Current lifecycle state.
    pub status: ThreadStatus,
    /// When the outbound email was dispatched.
    pub sent_at: DateTime<Utc>,
}

/// Fields required to create a thread after a successful dispatch.
#[derive(Debug, Clone)]
pub struct NewThread {
    /// Customer the thread belongs to.
    pub customer_id: CustomerId,
    /// Subject line.
    pub subject: String,
    /// Outbound body.
    pub body: String,
    /// Internal sender reference.
    pub sent_by: String,
    /// Provider-assigned message id.
    pub message_id: String,
}

/// One inbound (or outbound follow-up) message attributed to a thread.
#[derive(Debug, Clone, Serialize)]
pub struct EmailReply {
    /// Unique identifier.
    pub id: ReplyId,
    /// Owning thread.
    pub thread_id: ThreadId,
    /// Denormalized customer reference for history queries.
    pub customer_id: CustomerId,
    /// Cleaned reply body.
    pub reply_body: String,
    /// Sender address of the reply.
    pub sender_email: String,
    /// `Message-ID` of the reply; unique, the idempotency key.
    pub message_id: String,
    /// The `In-Reply-To` value that matched the thread.
    pub in_reply_to: String,
    /// When the reply was ingested.
    pub received_at: DateTime<Utc>,
}

/// Fields required to append a reply to a thread.
#[derive(Debug, Clone)]
pub struct NewReply {
    /// Owning thread.
    pub thread_id: ThreadId,
    /// Denormalized customer reference.
    pub customer_id: CustomerId,
    /// Cleaned reply body.
    pub reply_body: String,
    /// Sender address.
    pub sender_email: String,
    /// `Message-ID` of the reply.
    pub message_id: String,
    /// The matched `In-Reply-To` value.
    pub in_reply_to: String,
}

/// A thread with its replies, oldest reply first.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadWithReplies {
    /// The thread itself.
    #[serde(flatten)]
    pub thread: EmailThread,
    /// Replies in arrival order.
    pub replies: Vec<EmailReply>,
}

/// Pagination envelope for thread listings.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Page {
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub per_page: u32,
    /// Total matching rows.
    pub total: u64,
}

/// Aggregate counts for the dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ThreadStats {
    /// All threads ever created.
    pub total_threads: u64,
    /// Threads sent since the start of the current month.
    pub sent_this_month: u64,
    /// Threads with at least one reply.
    pub replied_threads: u64,
    /// Percentage of threads that got a reply, rounded.
    pub reply_rate: u8,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_column_roundtrip() {
        assert_eq!(ThreadStatus::Sent.as_str(), "sent");
        assert_eq!(ThreadStatus::Replied.as_str(), "replied");
        assert_eq!(ThreadStatus::from_column("replied"), ThreadStatus::Replied);
        assert_eq!(ThreadStatus::from_column("sent"), ThreadStatus::Sent);
        assert_eq!(ThreadStatus::from_column("junk"), ThreadStatus::Sent);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ThreadStatus::Replied).unwrap();
        assert_eq!(json, "\"replied\"");
    }

    #[test]
    fn ids_display_as_numbers() {
        assert_eq!(ThreadId(7).to_string(), "7");
        assert_eq!(CustomerId(3).to_string(), "3");
    }
}
