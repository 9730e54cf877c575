//! In-process notification bus.
//!
//! Platform messaging callbacks (token refresh, data-only pushes) publish here;
//! the session core subscribes. Topics are a closed enum rather than string
//! names.

use serde_json::{Map, Value};
use tokio::sync::broadcast;

#[cfg(test)]
mod tests;

const DEFAULT_CAPACITY: usize = 64;

/// A message carried on the [`NotificationBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A push token was issued or refreshed. Empty on deregistration.
    PushToken { token: String },
    /// A data-only push carrying an alert to show inside the app.
    SilentPayload { title: String, body: String },
}

impl Notification {
    /// Builds a token notification; a missing token is published as `""`.
    pub fn push_token(token: Option<&str>) -> Self {
        Notification::PushToken {
            token: token.unwrap_or_default().to_string(),
        }
    }

    pub fn silent_payload(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notification::SilentPayload {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Decodes the data dictionary of a remote notification.
    ///
    /// Returns `None` unless both `title` and `body` are present as strings.
    pub fn from_remote_data(data: &Map<String, Value>) -> Option<Self> {
        let title = data.get("title")?.as_str()?;
        let body = data.get("body")?.as_str()?;
        Some(Self::silent_payload(title, body))
    }

    pub fn topic(&self) -> &'static str {
        match self {
            Notification::PushToken { .. } => "push-token",
            Notification::SilentPayload { .. } => "silent-payload",
        }
    }
}

/// Broadcast bus for [`Notification`]s.
///
/// Cloning yields another handle to the same bus.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may fall behind before it
    /// starts losing notifications.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes to every current subscriber and returns how many received it.
    pub fn publish(&self, notification: Notification) -> usize {
        let topic = notification.topic();
        match self.sender.send(notification) {
            Ok(receivers) => {
                tracing::debug!(topic, receivers, "notification published");
                receivers
            }
            Err(_) => {
                tracing::debug!(topic, "notification published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}
