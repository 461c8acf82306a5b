//! Thread and reply storage.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;

use super::model::{
    CustomerId, EmailReply, EmailThread, NewReply, NewThread, Page, ReplyId, ThreadId,
    ThreadStats, ThreadStatus, ThreadWithReplies,
};
use crate::Result;
use crate::db::parse_timestamp;

/// Repository for `EmailThread` and `EmailReply` records.
///
/// Reply insertion is idempotent on `message_id`: replaying a message the
/// store has already seen returns the existing row instead of failing or
/// duplicating. That property is what makes sync-pass retries safe.
#[derive(Debug, Clone)]
pub struct ThreadRepository {
    pool: SqlitePool,
}

impl ThreadRepository {
    /// Creates a repository over an open pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Records a newly dispatched thread.
    ///
    /// Callers must have dispatched the email first; this only runs after
    /// the provider accepted the message.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (including a duplicate
    /// `message_id`, which would indicate a provider id collision).
    pub async fn create(&self, new: &NewThread) -> Result<EmailThread> {
        let sent_at = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO email_threads
                (customer_id, subject, body, sent_by, message_id, status, sent_at)
            VALUES (?, ?, ?, ?, ?, 'sent', ?)
            ",
        )
        .bind(new.customer_id.0)
        .bind(&new.subject)
        .bind(&new.body)
        .bind(&new.sent_by)
        .bind(&new.message_id)
        .bind(sent_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(thread_id = result.last_insert_rowid(), message_id = %new.message_id, "thread created");

        Ok(EmailThread {
            id: ThreadId(result.last_insert_rowid()),
            customer_id: new.customer_id,
            subject: new.subject.clone(),
            body: new.body.clone(),
            sent_by: new.sent_by.clone(),
            message_id: new.message_id.clone(),
            status: ThreadStatus::Sent,
            sent_at,
        })
    }

    /// Looks up a thread by its internal id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find(&self, id: ThreadId) -> Result<Option<EmailThread>> {
        let row = sqlx::query(
            r"
            SELECT id, customer_id, subject, body, sent_by, message_id, status, sent_at
            FROM email_threads WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| thread_from_row(&row)).transpose()
    }

    /// Looks up a thread by its outbound `Message-ID` - the matching
    /// primitive for inbound `In-Reply-To` values.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_message_id(&self, message_id: &str) -> Result<Option<EmailThread>> {
        let row = sqlx::query(
            r"
            SELECT id, customer_id, subject, body, sent_by, message_id, status, sent_at
            FROM email_threads WHERE message_id = ?
            ",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| thread_from_row(&row)).transpose()
    }

    /// Appends a reply and flips the thread status to `replied`.
    ///
    /// Idempotent on `message_id`: a repeated call returns the existing
    /// row and performs no second status transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the queries fail.
    pub async fn append_reply(&self, new: &NewReply) -> Result<EmailReply> {
        let received_at = Utc::now();
        sqlx::query(
            r"
            INSERT INTO email_replies
                (thread_id, customer_id, reply_body, sender_email, message_id, in_reply_to, received_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(message_id) DO NOTHING
            ",
        )
        .bind(new.thread_id.0)
        .bind(new.customer_id.0)
        .bind(&new.reply_body)
        .bind(&new.sender_email)
        .bind(&new.message_id)
        .bind(&new.in_reply_to)
        .bind(received_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        // Forward-only transition: a replied thread never reverts, and a
        // replayed reply finds zero rows to update.
        sqlx::query("UPDATE email_threads SET status = 'replied' WHERE id = ? AND status = 'sent'")
            .bind(new.thread_id.0)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query(
            r"
            SELECT id, thread_id, customer_id, reply_body, sender_email, message_id, in_reply_to, received_at
            FROM email_replies WHERE message_id = ?
            ",
        )
        .bind(&new.message_id)
        .fetch_one(&self.pool)
        .await?;

        reply_from_row(&row)
    }

    /// Replies for one thread, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn replies_for_thread(&self, thread_id: ThreadId) -> Result<Vec<EmailReply>> {
        let rows = sqlx::query(
            r"
            SELECT id, thread_id, customer_id, reply_body, sender_email, message_id, in_reply_to, received_at
            FROM email_replies WHERE thread_id = ?
            ORDER BY received_at ASC, id ASC
            ",
        )
        .bind(thread_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(reply_from_row).collect()
    }

    /// All threads for a customer with their replies; threads most recent
    /// first, replies oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the queries fail.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<ThreadWithReplies>> {
        let rows = sqlx::query(
            r"
            SELECT id, customer_id, subject, body, sent_by, message_id, status, sent_at
            FROM email_threads WHERE customer_id = ?
            ORDER BY sent_at DESC, id DESC
            ",
        )
        .bind(customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut threads = Vec::with_capacity(rows.len());
        for row in &rows {
            let thread = thread_from_row(row)?;
            let replies = self.replies_for_thread(thread.id).await?;
            threads.push(ThreadWithReplies { thread, replies });
        }
        Ok(threads)
    }

    /// Paged listing of threads, most recent first, optionally filtered
    /// by customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the queries fail.
    pub async fn list_paged(
        &self,
        page: u32,
        per_page: u32,
        customer: Option<CustomerId>,
    ) -> Result<(Vec<EmailThread>, Page)> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let (total, rows) = if let Some(customer_id) = customer {
            let total: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM email_threads WHERE customer_id = ?")
                    .bind(customer_id.0)
                    .fetch_one(&self.pool)
                    .await?;
            let rows = sqlx::query(
                r"
                SELECT id, customer_id, subject, body, sent_by, message_id, status, sent_at
                FROM email_threads WHERE customer_id = ?
                ORDER BY sent_at DESC, id DESC
                LIMIT ? OFFSET ?
                ",
            )
            .bind(customer_id.0)
            .bind(i64::from(per_page))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            (total, rows)
        } else {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM email_threads")
                .fetch_one(&self.pool)
                .await?;
            let rows = sqlx::query(
                r"
                SELECT id, customer_id, subject, body, sent_by, message_id, status, sent_at
                FROM email_threads
                ORDER BY sent_at DESC, id DESC
                LIMIT ? OFFSET ?
                ",
            )
            .bind(i64::from(per_page))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            (total, rows)
        };

        let threads = rows
            .iter()
            .map(thread_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok((
            threads,
            Page {
                page,
                per_page,
                total: total.max(0).unsigned_abs(),
            },
        ))
    }

    /// Aggregate thread counts for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn stats(&self) -> Result<ThreadStats> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total_threads,
                COUNT(*) FILTER (
                    WHERE sent_at >= strftime('%Y-%m-01T00:00:00', 'now')
                ) AS sent_this_month,
                COUNT(*) FILTER (WHERE status = 'replied') AS replied_threads
            FROM email_threads
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_threads: i64 = row.get("total_threads");
        let sent_this_month: i64 = row.get("sent_this_month");
        let replied_threads: i64 = row.get("replied_threads");

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let reply_rate = if total_threads > 0 {
            ((replied_threads as f64 / total_threads as f64) * 100.0).round() as u8
        } else {
            0
        };

        Ok(ThreadStats {
            total_threads: total_threads.unsigned_abs(),
            sent_this_month: sent_this_month.unsigned_abs(),
            replied_threads: replied_threads.unsigned_abs(),
            reply_rate,
        })
    }
}

fn thread_from_row(row: &SqliteRow) -> Result<EmailThread> {
    let status: String = row.get("status");
    let sent_at: String = row.get("sent_at");
    Ok(EmailThread {
        id: ThreadId(row.get("id")),
        customer_id: CustomerId(row.get("customer_id")),
        subject: row.get("subject"),
        body: row.get("body"),
        sent_by: row.get("sent_by"),
        message_id: row.get("message_id"),
        status: ThreadStatus::from_column(&status),
        sent_at: parse_timestamp(&sent_at)?,
    })
}

fn reply_from_row(row: &SqliteRow) -> Result<EmailReply> {
    let received_at: String = row.get("received_at");
    Ok(EmailReply {
        id: ReplyId(row.get("id")),
        thread_id: ThreadId(row.get("thread_id")),
        customer_id: CustomerId(row.get("customer_id")),
        reply_body: row.get("reply_body"),
        sender_email: row.get("sender_email"),
        message_id: row.get("message_id"),
        in_reply_to: row.get("in_reply_to"),
        received_at: parse_timestamp(&received_at)?,
    })
}
