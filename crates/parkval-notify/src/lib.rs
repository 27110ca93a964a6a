//! # parkval-notify
//!
//! Reports discount outcomes to an HTTP endpoint. Deliveries that fail are
//! kept in a `SQLite` outbox and retried by [`NotificationDispatcher::flush`].

pub mod dispatcher;
pub mod error;
pub mod http;
pub mod notification;
pub mod outbox;

pub use dispatcher::{Delivery, FlushReport, NotificationDispatcher};
pub use error::NotificationError;
pub use http::HttpNotifier;
pub use notification::Notification;
pub use outbox::{NotificationOutbox, PendingNotification};
