//! Notification bridge
//!
//! Fire-and-forget notices about recording lifecycle events. Delivery
//! failures are logged and never reach the recording state.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Lifecycle event worth telling the user about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    RecordingStarted { channel_name: String },
    #[serde(rename_all = "camelCase")]
    RecordingComplete {
        channel_name: String,
        duration: String,
    },
    #[serde(rename_all = "camelCase")]
    RecordingFailed { channel_name: String, error: String },
}

impl Notification {
    /// Completion notice; the label is whole minutes, e.g. "90 min"
    pub fn recording_complete(channel_name: &str, elapsed_minutes: i64) -> Self {
        Notification::RecordingComplete {
            channel_name: channel_name.to_string(),
            duration: format!("{} min", elapsed_minutes),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Notification::RecordingStarted { .. } => "Recording Started",
            Notification::RecordingComplete { .. } => "Recording Complete",
            Notification::RecordingFailed { .. } => "Recording Failed",
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::RecordingStarted { channel_name } => {
                format!("Recording {}...", channel_name)
            }
            Notification::RecordingComplete {
                channel_name,
                duration,
            } => format!("{} ({}) saved successfully.", channel_name, duration),
            Notification::RecordingFailed {
                channel_name,
                error,
            } => format!("Failed to record {}: {}", channel_name, error),
        }
    }
}

/// Sink for notifications. Implementations must not block or fail.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            notification = notification.title(),
            "{}",
            notification.body()
        );
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    body: String,
    #[serde(flatten)]
    event: &'a Notification,
}

/// POSTs notifications as JSON to a webhook
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, notification: Notification) {
        let client = self.client.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            let payload = WebhookPayload {
                title: notification.title(),
                body: notification.body(),
                event: &notification,
            };

            match client.post(&url).json(&payload).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!("Notification webhook returned HTTP {}", resp.status().as_u16());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Notification webhook failed: {}", e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_text() {
        let started = Notification::RecordingStarted {
            channel_name: "BBC One".to_string(),
        };
        assert_eq!(started.title(), "Recording Started");
        assert_eq!(started.body(), "Recording BBC One...");

        let complete = Notification::RecordingComplete {
            channel_name: "BBC One".to_string(),
            duration: "45 min".to_string(),
        };
        assert_eq!(complete.body(), "BBC One (45 min) saved successfully.");
    }

    #[test]
    fn test_completion_label_stays_in_minutes() {
        let long = Notification::recording_complete("ESPN", 90);
        assert_eq!(
            long,
            Notification::RecordingComplete {
                channel_name: "ESPN".to_string(),
                duration: "90 min".to_string(),
            }
        );
        assert_eq!(long.body(), "ESPN (90 min) saved successfully.");
        assert_eq!(
            Notification::recording_complete("ITV", 0).body(),
            "ITV (0 min) saved successfully."
        );
    }

    #[test]
    fn test_webhook_payload_shape() {
        let event = Notification::RecordingFailed {
            channel_name: "CNN".to_string(),
            error: "HTTP 404: Not Found".to_string(),
        };
        let payload = WebhookPayload {
            title: event.title(),
            body: event.body(),
            event: &event,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "recording_failed");
        assert_eq!(json["channelName"], "CNN");
        assert_eq!(json["title"], "Recording Failed");
    }

    #[tokio::test]
    async fn test_webhook_failure_does_not_panic() {
        // Nothing listens on port 9; the spawned POST fails and is only logged
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook").unwrap();
        notifier.notify(Notification::RecordingStarted {
            channel_name: "ITV".to_string(),
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
