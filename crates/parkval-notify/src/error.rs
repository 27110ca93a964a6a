/// Errors that can occur while delivering or storing notifications.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The HTTP request could not be built or sent.
    #[error("Notification request error: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status code.
    #[error("Notification endpoint error (status {status}): {body}")]
    ApiError {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Outbox operation failed.
    #[error("Database error: {0}")]
    Database(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<parkval_core::db::DatabaseError> for NotificationError {
    fn from(e: parkval_core::db::DatabaseError) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<sqlx::Error> for NotificationError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e.to_string())
    }
}
