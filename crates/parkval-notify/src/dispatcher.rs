//! Deliver now, fall back to the outbox.

use tracing::{info, warn};

use crate::error::NotificationError;
use crate::http::HttpNotifier;
use crate::notification::Notification;
use crate::outbox::NotificationOutbox;

/// What happened to a dispatched notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Delivery failed; stored in the outbox under this id.
    Queued { id: String },
    /// Delivery failed and there is no outbox to keep it.
    Dropped,
}

/// Result of one [`NotificationDispatcher::flush`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct NotificationDispatcher {
    notifier: HttpNotifier,
    outbox: Option<NotificationOutbox>,
}

impl NotificationDispatcher {
    pub const fn new(notifier: HttpNotifier, outbox: Option<NotificationOutbox>) -> Self {
        Self { notifier, outbox }
    }

    pub const fn outbox(&self) -> Option<&NotificationOutbox> {
        self.outbox.as_ref()
    }

    /// Try to deliver `notification` right away.
    ///
    /// Only outbox errors are returned; a failed delivery is reported through
    /// [`Delivery`].
    pub async fn dispatch(&self, notification: &Notification) -> Result<Delivery, NotificationError> {
        let err = match self.notifier.send(notification).await {
            Ok(()) => return Ok(Delivery::Sent),
            Err(e) => e,
        };

        let Some(outbox) = &self.outbox else {
            warn!(error = %err, ticket = %notification.ticket_code, "Notification lost");
            return Ok(Delivery::Dropped);
        };

        let id = outbox.enqueue(notification).await?;
        outbox.record_failure(&id, &err.to_string()).await?;
        warn!(error = %err, id = %id, "Notification queued for retry");
        Ok(Delivery::Queued { id })
    }

    /// Retry up to `limit` pending notifications, oldest first.
    pub async fn flush(&self, limit: i64) -> Result<FlushReport, NotificationError> {
        let mut report = FlushReport::default();
        let Some(outbox) = &self.outbox else {
            return Ok(report);
        };

        for pending in outbox.pending(limit).await? {
            let outcome = match pending.notification() {
                Ok(notification) => self.notifier.send(&notification).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => {
                    outbox.mark_delivered(&pending.id).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    outbox.record_failure(&pending.id, &e.to_string()).await?;
                    report.failed += 1;
                }
            }
        }

        info!(
            delivered = report.delivered,
            failed = report.failed,
            url = %self.notifier.url(),
            "Outbox flushed"
        );
        Ok(report)
    }
}
