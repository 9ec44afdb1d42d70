use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::{MessagePayload, NotifyEvent, UserId};

/// Errors surfaced by the messaging transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("delivery failed for user {user_id}: {reason}")]
    Delivery { user_id: UserId, reason: String },
}

/// Outbound side of the messaging transport: engine-originated events and
/// relayed chat messages. A failed `relay` means the partner is
/// unreachable and the engine treats it as an implicit disconnect.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: UserId, event: NotifyEvent) -> Result<(), TransportError>;

    async fn relay(&self, user_id: UserId, payload: &MessagePayload)
        -> Result<(), TransportError>;
}

#[derive(Serialize)]
struct NotifyBody<'a> {
    #[serde(rename = "userId")]
    user_id: UserId,
    event: &'a NotifyEvent,
}

#[derive(Serialize)]
struct RelayBody<'a> {
    #[serde(rename = "userId")]
    user_id: UserId,
    payload: &'a MessagePayload,
}

/// Webhook-based transport client: pushes JSON to the bot front-end that
/// owns the actual platform connection.
pub struct WebhookNotifier {
    base_url: String,
    auth_token: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(base_url: String, auth_token: String, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, auth_token, client }
    }

    async fn post<T: Serialize>(
        &self,
        path: &str,
        user_id: UserId,
        body: &T,
    ) -> Result<(), TransportError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Delivery {
                user_id,
                reason: format!("transport returned {}", response.status()),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, user_id: UserId, event: NotifyEvent) -> Result<(), TransportError> {
        tracing::debug!("notify {}: {:?}", user_id, event);
        self.post("notify", user_id, &NotifyBody { user_id, event: &event })
            .await
    }

    async fn relay(
        &self,
        user_id: UserId,
        payload: &MessagePayload,
    ) -> Result<(), TransportError> {
        self.post("relay", user_id, &RelayBody { user_id, payload })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_trims_trailing_slash() {
        let notifier =
            WebhookNotifier::new("https://transport.test/hooks/".to_string(), "tok".into(), 10);
        assert_eq!(notifier.base_url.trim_end_matches('/'), "https://transport.test/hooks");
    }
}
