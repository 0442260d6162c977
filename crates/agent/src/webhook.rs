use std::time::Duration;

use quickquote_core::config::ShareConfig;
use quickquote_core::share::{SentQuotePayload, ShareError};
use reqwest::Client;
use tracing::{info, warn};

/// Posts sent quotes to an accounting system's webhook.
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    /// `None` when no webhook is configured.
    pub fn from_config(config: &ShareConfig) -> Result<Option<Self>, ShareError> {
        let Some(url) = config.webhook_url.clone() else {
            return Ok(None);
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.webhook_timeout_secs))
            .build()
            .map_err(|error| ShareError::Delivery(error.to_string()))?;
        Ok(Some(Self { http, url }))
    }

    pub async fn deliver(&self, payload: &SentQuotePayload) -> Result<(), ShareError> {
        let response = self.http.post(&self.url).json(payload).send().await.map_err(|error| {
            warn!(
                event_name = "share.webhook.failed",
                record_id = %payload.record_id,
                error = %error,
                "webhook request failed"
            );
            ShareError::Delivery(format!("request failed: {error}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "share.webhook.rejected",
                record_id = %payload.record_id,
                status = %status,
                "webhook endpoint rejected quote"
            );
            return Err(ShareError::Delivery(format!("webhook returned {status}")));
        }

        info!(event_name = "share.webhook.delivered", record_id = %payload.record_id, "sent quote delivered");
        Ok(())
    }
}
