//! `SQLite` outbox of notifications waiting for delivery.

use parkval_core::db::unix_timestamp;

use crate::error::NotificationError;
use crate::notification::Notification;

parkval_core::define_database!(NotificationOutbox, "Notification outbox migrations complete");

/// A stored notification that has not been delivered yet.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingNotification {
    pub id: String,
    /// JSON-serialized [`Notification`].
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
}

impl PendingNotification {
    pub fn notification(&self) -> Result<Notification, NotificationError> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

impl NotificationOutbox {
    /// Store `notification` for later delivery and return its id.
    pub async fn enqueue(&self, notification: &Notification) -> Result<String, NotificationError> {
        let id = uuid::Uuid::new_v4().to_string();
        let payload = serde_json::to_string(notification)?;

        sqlx::query(
            "INSERT INTO pending_notifications (id, payload, attempts, created_at) \
             VALUES (?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&payload)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(id)
    }

    /// Undelivered notifications, oldest first.
    pub async fn pending(&self, limit: i64) -> Result<Vec<PendingNotification>, NotificationError> {
        let rows = sqlx::query_as::<_, PendingNotification>(
            "SELECT id, payload, attempts, last_error, created_at \
             FROM pending_notifications \
             WHERE delivered_at IS NULL \
             ORDER BY created_at ASC, rowid ASC \
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    pub async fn pending_count(&self) -> Result<i64, NotificationError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pending_notifications WHERE delivered_at IS NULL",
        )
        .fetch_one(self.pool())
        .await?;

        Ok(count)
    }

    /// Mark a notification delivered.
    ///
    /// Returns `false` if it was unknown or already delivered.
    pub async fn mark_delivered(&self, id: &str) -> Result<bool, NotificationError> {
        let result = sqlx::query(
            "UPDATE pending_notifications SET delivered_at = ? \
             WHERE id = ? AND delivered_at IS NULL",
        )
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count a failed delivery attempt and remember why it failed.
    pub async fn record_failure(&self, id: &str, error: &str) -> Result<bool, NotificationError> {
        let result = sqlx::query(
            "UPDATE pending_notifications SET attempts = attempts + 1, last_error = ? \
             WHERE id = ? AND delivered_at IS NULL",
        )
        .bind(error)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
