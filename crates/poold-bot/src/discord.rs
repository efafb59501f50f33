// ABOUTME: Minimal REST client for the chat platform (Discord HTTP API).
// ABOUTME: Covers channel messages, bulk deletion, and interaction follow-ups.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";

/// Errors from chat platform calls. Not retried; a failure surfaces to the
/// invoking handler (or is logged when the call is best-effort).
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat transport error: {0}")]
    Transport(String),

    #[error("chat API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected chat response: {0}")]
    InvalidResponse(String),
}

/// One message in a channel, reduced to what cleanup needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

/// Bot-token REST client. Announcements and cleanup go through here; the
/// interaction responses themselves are returned inline by the webhook.
pub struct DiscordRest {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl DiscordRest {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API host. Used in tests.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Post a public message to a channel.
    pub async fn create_message(&self, channel_id: &str, content: &str) -> Result<(), ChatError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bot {}", self.token))
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        check(response).await.map(|_| ())
    }

    /// The most recent messages in a channel, newest first. `limit` is
    /// capped at 100 by the platform.
    pub async fn list_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>, ChatError> {
        let url = format!(
            "{}/channels/{}/messages?limit={}",
            self.base_url, channel_id, limit
        );
        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        check(response)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::InvalidResponse(e.to_string()))
    }

    /// Delete several messages in one call. The platform only accepts 2-100
    /// ids, all younger than its bulk-delete window; callers enforce both.
    pub async fn bulk_delete(&self, channel_id: &str, ids: &[String]) -> Result<(), ChatError> {
        let url = format!(
            "{}/channels/{}/messages/bulk-delete",
            self.base_url, channel_id
        );
        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bot {}", self.token))
            .json(&json!({ "messages": ids }))
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        check(response).await.map(|_| ())
    }

    /// Delete a single message.
    pub async fn delete_message(&self, channel_id: &str, id: &str) -> Result<(), ChatError> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.base_url, channel_id, id
        );
        let response = self
            .client
            .delete(&url)
            .header("authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        check(response).await.map(|_| ())
    }

    /// Post a follow-up to a deferred interaction via its webhook.
    pub async fn create_followup(
        &self,
        application_id: &str,
        interaction_token: &str,
        content: &str,
        ephemeral: bool,
    ) -> Result<(), ChatError> {
        let url = format!(
            "{}/webhooks/{}/{}",
            self.base_url, application_id, interaction_token
        );
        let mut body = json!({ "content": content });
        if ephemeral {
            body["flags"] = json!(64);
        }

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        check(response).await.map(|_| ())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChatError::Api {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_message_parses_platform_timestamp() {
        let json = r#"{"id": "123", "timestamp": "2026-08-01T12:30:00.123000+00:00"}"#;
        let message: ChannelMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.id, "123");
        assert_eq!(message.timestamp.to_rfc3339(), "2026-08-01T12:30:00.123+00:00");
    }

    #[test]
    fn base_url_override_applies() {
        let rest = DiscordRest::new("t".to_string()).with_base_url("http://127.0.0.1:9".to_string());
        assert_eq!(rest.base_url, "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn transport_failure_maps_to_chat_error() {
        // Port 9 (discard) is closed; the connection is refused immediately.
        let rest = DiscordRest::new("t".to_string()).with_base_url("http://127.0.0.1:9".to_string());
        let err = rest.create_message("1", "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
    }
}
