//! Slack-compatible incoming webhook delivery.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::{Notification, Sender};
use crate::error::NotifyError;

#[derive(Debug, Serialize)]
struct Field<'a> {
    title: &'a str,
    value: String,
    short: bool,
}

#[derive(Debug, Serialize)]
struct Attachment<'a> {
    color: &'static str,
    fields: Vec<Field<'a>>,
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    attachments: Vec<Attachment<'a>>,
}

/// Posts notifications to a chat webhook as a single colored attachment
pub struct SlackSender {
    webhook: String,
    username: Option<String>,
    channel: Option<String>,
    client: reqwest::Client,
}

impl SlackSender {
    pub fn new(webhook: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { webhook: webhook.into(), username: None, channel: None, client })
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    fn payload<'a>(&'a self, notification: &'a Notification) -> Payload<'a> {
        Payload {
            text: &notification.title,
            username: self.username.as_deref(),
            channel: self.channel.as_deref(),
            attachments: vec![Attachment {
                color: notification.severity.as_str(),
                fields: vec![
                    Field {
                        title: &notification.title,
                        value: notification.endpoint.clone(),
                        short: false,
                    },
                    Field {
                        title: "Status",
                        value: notification.status.to_string().to_uppercase(),
                        short: false,
                    },
                ],
            }],
        }
    }
}

#[async_trait::async_trait]
impl Sender for SlackSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        debug!("Posting notification for {}", notification.endpoint);

        let response = self.client.post(&self.webhook).json(&self.payload(notification)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::monitoring::Status;
    use crate::notify::Severity;

    fn notification(severity: Severity, status: Status) -> Notification {
        Notification {
            title: "api".to_string(),
            endpoint: "https://api.example.com".to_string(),
            status,
            severity,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_payload_shape() {
        let sender = SlackSender::new("http://localhost/hook").unwrap().with_username("vigil").with_channel("#ops");
        let n = notification(Severity::Danger, Status::Down);

        let json = serde_json::to_value(sender.payload(&n)).unwrap();

        assert_eq!(json["text"], "api");
        assert_eq!(json["username"], "vigil");
        assert_eq!(json["channel"], "#ops");
        assert_eq!(json["attachments"][0]["color"], "danger");
        assert_eq!(json["attachments"][0]["fields"][0]["title"], "api");
        assert_eq!(json["attachments"][0]["fields"][0]["value"], "https://api.example.com");
        assert_eq!(json["attachments"][0]["fields"][1]["value"], "DOWN");
    }

    #[test]
    fn test_payload_omits_unset_identity() {
        let sender = SlackSender::new("http://localhost/hook").unwrap();
        let json = serde_json::to_value(sender.payload(&notification(Severity::Good, Status::Healthy))).unwrap();

        assert!(json.get("username").is_none());
        assert!(json.get("channel").is_none());
        assert_eq!(json["attachments"][0]["color"], "good");
    }

    #[tokio::test]
    async fn test_rejected_webhook_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
            }
        });

        let sender = SlackSender::new(format!("http://{addr}/hook")).unwrap();
        let err = sender.send(&notification(Severity::Danger, Status::Down)).await.unwrap_err();
        assert!(matches!(err, NotifyError::Status(404)));
    }
}
