//! Webhook adapter. Implements NotificationPort by POSTing JSON to a configured URL.

use crate::domain::DomainError;
use crate::ports::NotificationPort;
use reqwest::Client;
use std::sync::Arc;

/// Forwards member notifications to an external endpoint (push gateway, chat bot, ...).
///
/// Body: `{"member_id": 1, "message": "...", "sent_at": "2024-05-06T09:00:00"}`.
pub struct WebhookNotifier {
    client: Arc<Client>,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            url,
        }
    }

    fn body(member_id: i64, message: &str, sent_at: chrono::NaiveDateTime) -> serde_json::Value {
        serde_json::json!({
            "member_id": member_id,
            "message": message,
            "sent_at": sent_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        })
    }
}

#[async_trait::async_trait]
impl NotificationPort for WebhookNotifier {
    async fn notify(&self, member_id: i64, message: &str) -> Result<(), DomainError> {
        let body = Self::body(member_id, message, chrono::Local::now().naive_local());

        let res = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::Notify(format!("Request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(DomainError::Notify(format!(
                "Webhook error {}: {}",
                status, text
            )));
        }

        Ok(())
    }
}
