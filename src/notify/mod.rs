//! Operator alerting.
//!
//! Jobs report failures and delinquency through a [`Notifier`]. Delivery is
//! best effort: callers log and drop errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

pub mod mock;
pub mod webhook;

pub use mock::MockNotifier;
pub use webhook::WebhookNotifier;

/// One alert addressed to an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Alert delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Deliver `subject` and `body` to the configured recipient.
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub enum NotifyError {
    /// Connection failure, timeout, DNS.
    NetworkError(String),
    /// Non-success response from the relay.
    HttpError { status: u16, message: String },
    /// Rejected by the channel itself.
    Rejected(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            NotifyError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            NotifyError::Rejected(msg) => write!(f, "Rejected: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Writes alerts to the log only. Used when no relay is configured.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    to: String,
}

impl LogNotifier {
    pub fn new(to: impl Into<String>) -> Self {
        Self { to: to.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        info!(to = %self.to, subject = %subject, body = %body, "alert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_error_display() {
        let err = NotifyError::NetworkError("connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: connection refused");

        let err = NotifyError::HttpError {
            status: 502,
            message: "Bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 502: Bad gateway");
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = LogNotifier::new("ops@example.com");
        assert!(notifier.notify("subject", "body").await.is_ok());
    }
}
