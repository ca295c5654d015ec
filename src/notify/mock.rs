//! In-memory notifier for tests.

use super::{Alert, Notifier, NotifyError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Records every alert it is asked to deliver; optionally fails each delivery.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<Alert>>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail after recording the attempt.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Alerts received so far, in order.
    pub fn sent(&self) -> Vec<Alert> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(Alert {
                to: "mock".to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        }
        if self.fail {
            return Err(NotifyError::Rejected("mock notifier configured to fail".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_alerts_even_when_failing() {
        let ok = MockNotifier::new();
        ok.notify("a", "b").await.unwrap();
        assert_eq!(ok.sent().len(), 1);

        let failing = MockNotifier::failing();
        assert!(failing.notify("a", "b").await.is_err());
        assert_eq!(failing.sent()[0].subject, "a");
    }
}
