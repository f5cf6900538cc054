//! Chat notification seam and its Slack implementation.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use forksync_core::Secret;

use crate::error::NotifyError;

pub trait Notifier {
    /// Deliver `text` to the configured channel.
    fn post(&self, text: &str) -> Result<(), NotifyError>;
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn post(&self, text: &str) -> Result<(), NotifyError> {
        (**self).post(text)
    }
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts through Slack's `chat.postMessage` with a bot token.
pub struct SlackNotifier {
    agent: ureq::Agent,
    api_base: String,
    token: Secret,
    channel: String,
}

impl SlackNotifier {
    pub fn new(api_base: &str, token: Secret, channel: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            token,
            channel: channel.into(),
        }
    }
}

impl Notifier for SlackNotifier {
    fn post(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.token.expose()))
            .send_json(json!({ "channel": self.channel, "text": text }))
            .map_err(|err| match err {
                ureq::Error::Status(status, response) => NotifyError::Status {
                    status,
                    body: response.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(t) => NotifyError::Transport(t.to_string()),
            })?;

        let parsed: SlackResponse = response
            .into_json()
            .map_err(|e| NotifyError::Decode(e.to_string()))?;
        if parsed.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected(
                parsed.error.unwrap_or_else(|| "unknown error".to_owned()),
            ))
        }
    }
}
