//! Mail relay reached over HTTP.

use super::{Alert, Notifier, NotifyError};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Posts each alert as JSON `{to, subject, body}` to a relay endpoint.
///
/// Network failures, 429 and 5xx responses are retried with exponential
/// backoff for up to `max_elapsed`; other 4xx responses fail immediately.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    to: String,
    max_elapsed: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            to: to.into(),
            max_elapsed: Duration::from_secs(30),
        }
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let alert = Alert {
            to: self.to.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&self.url)
                .json(&alert)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(NotifyError::NetworkError(e.to_string())))?;

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                debug!(status = status.as_u16(), "alert relay busy, retrying");
                return Err(backoff::Error::transient(NotifyError::HttpError {
                    status: status.as_u16(),
                    message: "Relay unavailable".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(NotifyError::HttpError {
                    status: status.as_u16(),
                    message: "Relay rejected alert".to_string(),
                }));
            }
            Ok(())
        })
        .await?;

        info!(to = %self.to, subject = %subject, "alert delivered");
        Ok(())
    }
}
