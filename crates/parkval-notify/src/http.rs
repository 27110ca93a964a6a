//! HTTP delivery of notifications.

use std::time::Duration;

use parkval_core::config::NotificationConfig;
use tracing::{debug, warn};

use crate::error::NotificationError;
use crate::notification::Notification;

/// Posts notifications as JSON to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    http: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    /// Build a notifier whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotificationError> {
        // reqwest is built without a bundled crypto provider; install ring
        // (no-op if another provider is already installed).
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Request(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// Use a preconfigured client (proxy settings, TLS roots).
    pub fn with_client(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotificationError> {
        Self::new(config.url.clone(), config.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST `notification`; any non-2xx answer is an error.
    pub async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let response = self
            .http
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotificationError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(url = %self.url, status = status.as_u16(), "Notification delivered");
            Ok(())
        } else {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            warn!(url = %self.url, status = status_code, body = %body, "Notification endpoint returned error");
            Err(NotificationError::ApiError {
                status: status_code,
                body,
            })
        }
    }
}
