//! `notifications` subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;

use parkval_core::Config;
use parkval_notify::{HttpNotifier, NotificationDispatcher, NotificationOutbox, PendingNotification};

#[derive(Subcommand, Debug)]
pub enum NotificationAction {
    /// List notifications waiting for delivery
    List {
        /// Maximum number of results
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
    /// Retry delivery of pending notifications, oldest first
    Flush {
        /// Maximum number of notifications to retry
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
}

/// Outbox database location: the configured path, else the per-user default.
pub fn outbox_path(config: &Config) -> Option<PathBuf> {
    config
        .notification
        .database_path
        .clone()
        .or_else(parkval_core::config::database_path)
}

pub async fn run(action: NotificationAction, config: &Config) -> Result<ExitCode> {
    let path = outbox_path(config)
        .context("No outbox location: set notification.database_path in settings")?;
    let outbox = NotificationOutbox::open(&path)
        .await
        .with_context(|| format!("Failed to open outbox {}", path.display()))?;

    let mut out = io::stdout().lock();
    match action {
        NotificationAction::List { limit } => {
            let pending = outbox.pending(limit).await?;
            if pending.is_empty() {
                writeln!(out, "No pending notifications.")?;
            }
            for row in &pending {
                writeln!(out, "{}", format_pending(row))?;
            }
            Ok(ExitCode::SUCCESS)
        }
        NotificationAction::Flush { limit } => {
            let notifier = HttpNotifier::from_config(&config.notification)?;
            let dispatcher = NotificationDispatcher::new(notifier, Some(outbox));
            let report = dispatcher.flush(limit).await?;
            writeln!(out, "Delivered {}, failed {}.", report.delivered, report.failed)?;
            Ok(if report.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn format_pending(row: &PendingNotification) -> String {
    let summary = row.notification().map_or_else(
        |_| "<unreadable payload>".to_string(),
        |n| {
            format!(
                "ticket {} value {:.2} {}: {}",
                n.ticket_code,
                n.vl_total,
                if n.success { "ok" } else { "failed" },
                n.message
            )
        },
    );
    let last_error = row.last_error.as_deref().unwrap_or("-");
    format!(
        "{}  attempts={}  {}  last_error={}",
        row.id, row.attempts, summary, last_error
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(payload: &str) -> PendingNotification {
        PendingNotification {
            id: "n-1".into(),
            payload: payload.into(),
            attempts: 2,
            last_error: Some("status 503".into()),
            created_at: 1_735_718_400,
        }
    }

    #[test]
    fn pending_row_summary() {
        let payload = r#"{"ticket_code":"922","num_ped_ecf":1,"vl_total":12.69,"operation_type":16,"success":true,"message":"validated"}"#;
        assert_eq!(
            format_pending(&row(payload)),
            "n-1  attempts=2  ticket 922 value 12.69 ok: validated  last_error=status 503"
        );
    }

    #[test]
    fn unreadable_payload_is_reported() {
        assert!(format_pending(&row("not json")).contains("<unreadable payload>"));
    }

    #[test]
    fn configured_outbox_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.notification.database_path = Some(dir.path().join("outbox.db"));
        assert_eq!(outbox_path(&config), Some(dir.path().join("outbox.db")));
    }
}
