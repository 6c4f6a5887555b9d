use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::effect::Notification;

/// Outbound channel for rep notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> AppResult<()>;
}

/// Writes notifications to the log. Used when no delivery endpoint is
/// configured.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        info!(
            target: "crm::notify",
            recipient = %notification.recipient_rep_id,
            subject = %notification.subject,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }
}

/// Posts each notification as JSON to an HTTP endpoint (mail relay, chat
/// webhook, ...).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: StdDuration) -> AppResult<Self> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(AppError::validation(
                "notification webhook must start with http:// or https://",
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::other(format!("failed to build http client: {err}")))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await
            .map_err(|err| AppError::other(format!("notification request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::other(format!(
                "notification endpoint responded with {status}"
            )));
        }
        Ok(())
    }
}

/// Sends notifications after the triggering write has committed. Failures
/// are logged and never reach the caller.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingNotifier))
    }

    /// Spawns one delivery per notification on the current runtime and
    /// returns the handles so callers that care (tests) can await them.
    pub fn dispatch(&self, notifications: Vec<Notification>) -> Vec<JoinHandle<()>> {
        if notifications.is_empty() {
            return Vec::new();
        }

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                for notification in &notifications {
                    warn!(
                        target: "crm::notify",
                        recipient = %notification.recipient_rep_id,
                        subject = %notification.subject,
                        "no async runtime available, notification dropped"
                    );
                }
                return Vec::new();
            }
        };

        notifications
            .into_iter()
            .map(|notification| {
                let notifier = Arc::clone(&self.notifier);
                handle.spawn(async move {
                    deliver(notifier.as_ref(), &notification).await;
                })
            })
            .collect()
    }
}

async fn deliver(notifier: &dyn Notifier, notification: &Notification) {
    if let Err(err) = notifier.send(notification).await {
        warn!(
            target: "crm::notify",
            recipient = %notification.recipient_rep_id,
            subject = %notification.subject,
            error = %err,
            "notification delivery failed"
        );
    }
}
