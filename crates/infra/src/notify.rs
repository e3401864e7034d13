//! Broadcast notifications to every subscribed device.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use portal_core::DomainError;

/// Topic every client subscribes to.
pub const BROADCAST_TOPIC: &str = "all_users";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("title is required"));
        }
        Ok(Self {
            title,
            body: body.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReceipt {
    pub message_id: String,
    pub topic: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification dispatch failed: {0}")]
    DispatchFailed(String),
}

/// Fan-out to the push service. Only accepted/failed is observable.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, topic: &str, notification: &Notification) -> Result<DispatchReceipt, NotifyError>;
}

#[async_trait]
impl<D> NotificationDispatcher for Arc<D>
where
    D: NotificationDispatcher + ?Sized,
{
    async fn dispatch(&self, topic: &str, notification: &Notification) -> Result<DispatchReceipt, NotifyError> {
        (**self).dispatch(topic, notification).await
    }
}

/// Send to [`BROADCAST_TOPIC`].
pub async fn broadcast<D>(dispatcher: &D, notification: &Notification) -> Result<DispatchReceipt, NotifyError>
where
    D: NotificationDispatcher + ?Sized,
{
    let receipt = dispatcher.dispatch(BROADCAST_TOPIC, notification).await?;
    tracing::info!(
        topic = %receipt.topic,
        message_id = %receipt.message_id,
        title = %notification.title,
        "notification broadcast"
    );
    Ok(receipt)
}

const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct PushRequest<'a> {
    topic: &'a str,
    notification: &'a Notification,
}

#[derive(Deserialize)]
struct PushResponse {
    #[serde(rename = "messageId", alias = "name")]
    message_id: String,
}

/// Posts `{topic, notification: {title, body}}` to a push gateway.
///
/// Any non-2xx status, transport error or response without a message id
/// is a failed dispatch.
#[derive(Debug, Clone)]
pub struct HttpPushDispatcher {
    client: reqwest::Client,
    endpoint: String,
    credential: String,
}

impl HttpPushDispatcher {
    pub fn new(endpoint: impl Into<String>, credential: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::DispatchFailed(format!("cannot build http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            credential: credential.into(),
        })
    }
}

#[async_trait]
impl NotificationDispatcher for HttpPushDispatcher {
    #[tracing::instrument(skip(self, notification), fields(endpoint = %self.endpoint))]
    async fn dispatch(&self, topic: &str, notification: &Notification) -> Result<DispatchReceipt, NotifyError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.credential)
            .json(&PushRequest { topic, notification })
            .send()
            .await
            .map_err(|e| NotifyError::DispatchFailed(format!("push gateway unreachable: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::DispatchFailed(format!("push gateway returned {status}: {body}")));
        }

        let accepted: PushResponse = resp
            .json()
            .await
            .map_err(|e| NotifyError::DispatchFailed(format!("unreadable push gateway response: {e}")))?;
        Ok(DispatchReceipt {
            message_id: accepted.message_id,
            topic: topic.to_string(),
        })
    }
}

/// Stands in when no push gateway is configured; every dispatch fails.
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredDispatcher;

#[async_trait]
impl NotificationDispatcher for UnconfiguredDispatcher {
    async fn dispatch(&self, _topic: &str, _notification: &Notification) -> Result<DispatchReceipt, NotifyError> {
        Err(NotifyError::DispatchFailed("no push gateway configured".to_string()))
    }
}

/// Keeps everything it was asked to send. Can be switched to fail.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<(String, Notification)>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, topic: &str, notification: &Notification) -> Result<DispatchReceipt, NotifyError> {
        if self.fail {
            return Err(NotifyError::DispatchFailed("push service rejected the message".to_string()));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| NotifyError::DispatchFailed("recorder lock poisoned".to_string()))?;
        sent.push((topic.to_string(), notification.clone()));
        Ok(DispatchReceipt {
            message_id: format!("recorded-{}", sent.len()),
            topic: topic.to_string(),
        })
    }
}
