use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

use bento_core::config::LineConfig;

use crate::messages::OutboundMessage;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply transport failed: {0}")]
    Transport(String),
    #[error("platform rejected the message batch with status {status}")]
    Rejected { status: u16 },
}

/// Outbound side of the Messaging API: reply within a webhook turn, push
/// outside of it, and resolve a user's display name for greetings.
#[async_trait]
pub trait ReplyClient: Send + Sync {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError>;

    async fn push(&self, user_id: &str, messages: Vec<OutboundMessage>)
        -> Result<(), ReplyError>;

    /// `None` when the profile cannot be fetched; greetings degrade to the
    /// nameless form.
    async fn fetch_display_name(&self, user_id: &str) -> Option<String>;
}

pub struct HttpReplyClient {
    http: reqwest::Client,
    channel_access_token: SecretString,
    base_url: String,
}

#[derive(Serialize)]
struct ReplyRequest<'a> {
    #[serde(rename = "replyToken")]
    reply_token: &'a str,
    messages: &'a [OutboundMessage],
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [OutboundMessage],
}

#[derive(Deserialize)]
struct ProfileResponse {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

impl HttpReplyClient {
    pub fn new(config: &LineConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            channel_access_token: config.channel_access_token.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
        })
    }

    async fn post_messages<T: Serialize + Sync>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<(), ReplyError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(self.channel_access_token.expose_secret())
            .json(payload)
            .send()
            .await
            .map_err(|error| ReplyError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplyError::Rejected { status: status.as_u16() });
        }
        Ok(())
    }
}

#[async_trait]
impl ReplyClient for HttpReplyClient {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError> {
        self.post_messages("/v2/bot/message/reply", &ReplyRequest { reply_token, messages: &messages })
            .await
    }

    async fn push(
        &self,
        user_id: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError> {
        self.post_messages("/v2/bot/message/push", &PushRequest { to: user_id, messages: &messages })
            .await
    }

    async fn fetch_display_name(&self, user_id: &str) -> Option<String> {
        let response = self
            .http
            .get(format!("{}/v2/bot/profile/{user_id}", self.base_url))
            .bearer_auth(self.channel_access_token.expose_secret())
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(
                    event_name = "line.profile.rejected",
                    status = response.status().as_u16(),
                    user_id,
                    "profile fetch was rejected"
                );
                return None;
            }
            Err(error) => {
                warn!(event_name = "line.profile.request_failed", error = %error, user_id, "profile fetch failed");
                return None;
            }
        };

        match response.json::<ProfileResponse>().await {
            Ok(profile) => profile.display_name.filter(|name| !name.is_empty()),
            Err(error) => {
                warn!(event_name = "line.profile.decode_failed", error = %error, user_id, "profile response was not decodable");
                None
            }
        }
    }
}

/// Swallows everything; keeps local runs alive without platform credentials.
#[derive(Default)]
pub struct NoopReplyClient;

#[async_trait]
impl ReplyClient for NoopReplyClient {
    async fn reply(
        &self,
        _reply_token: &str,
        _messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError> {
        Ok(())
    }

    async fn push(
        &self,
        _user_id: &str,
        _messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError> {
        Ok(())
    }

    async fn fetch_display_name(&self, _user_id: &str) -> Option<String> {
        None
    }
}

/// Records every outbound batch for assertions in tests.
#[derive(Default)]
pub struct RecordingReplyClient {
    pub sent: Mutex<Vec<SentBatch>>,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SentBatch {
    Reply { reply_token: String, messages: Vec<OutboundMessage> },
    Push { user_id: String, messages: Vec<OutboundMessage> },
}

impl RecordingReplyClient {
    pub fn with_display_name(display_name: impl Into<String>) -> Self {
        Self { sent: Mutex::new(Vec::new()), display_name: Some(display_name.into()) }
    }

    pub async fn batches(&self) -> Vec<SentBatch> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ReplyClient for RecordingReplyClient {
    async fn reply(
        &self,
        reply_token: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError> {
        self.sent
            .lock()
            .await
            .push(SentBatch::Reply { reply_token: reply_token.to_owned(), messages });
        Ok(())
    }

    async fn push(
        &self,
        user_id: &str,
        messages: Vec<OutboundMessage>,
    ) -> Result<(), ReplyError> {
        self.sent.lock().await.push(SentBatch::Push { user_id: user_id.to_owned(), messages });
        Ok(())
    }

    async fn fetch_display_name(&self, _user_id: &str) -> Option<String> {
        self.display_name.clone()
    }
}
