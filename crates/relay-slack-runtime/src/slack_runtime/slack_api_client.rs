//! Slack Web API client used by the socket loop, context fetching and replies.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::slack_helpers::{
    is_retryable_slack_status, is_retryable_transport_error, parse_retry_after, retry_delay,
};
use relay_core::truncate_for_error;

const REPLIES_PAGE_LIMIT: usize = 200;
const REPLIES_MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct SlackApiResponse<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

impl<T> SlackApiResponse<T> {
    fn into_body(self, method: &str) -> Result<T> {
        if !self.ok {
            bail!(
                "slack {method} failed: {}",
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(self.body)
    }
}

#[derive(Debug, Deserialize)]
struct SlackEmptyBody {}

#[derive(Debug, Deserialize)]
struct SlackAuthTestBody {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackOpenSocketBody {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackChatMessageBody {
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    channel: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlackRepliesBody {
    #[serde(default)]
    messages: Vec<SlackReplyMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<SlackResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct SlackConversationInfoBody {
    #[serde(default)]
    channel: Option<SlackChannelInfo>,
}

#[derive(Debug, Deserialize)]
struct SlackUserInfoBody {
    #[serde(default)]
    user: Option<SlackUserInfo>,
}

/// Raw thread reply as returned by `conversations.replies`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackReplyMessage {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackChannelInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_im: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackUserInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackPostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Clone)]
pub struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    app_token: String,
    bot_token: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl SlackApiClient {
    pub fn new(
        api_base: String,
        app_token: String,
        bot_token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("slack-cursor-relay"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_token: app_token.trim().to_string(),
            bot_token: bot_token.trim().to_string(),
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    pub async fn resolve_bot_user_id(&self) -> Result<String> {
        let body: SlackAuthTestBody = self
            .call(
                "auth.test",
                || self.http.post(self.endpoint("auth.test")).bearer_auth(&self.bot_token),
            )
            .await?;
        body.user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    pub async fn open_socket_connection(&self) -> Result<String> {
        let body: SlackOpenSocketBody = self
            .call("apps.connections.open", || {
                self.http
                    .post(self.endpoint("apps.connections.open"))
                    .bearer_auth(&self.app_token)
            })
            .await?;
        body.url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack apps.connections.open did not return url"))
    }

    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<SlackPostedMessage> {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(thread_ts) = thread_ts.map(str::trim).filter(|value| !value.is_empty()) {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }

        let body: SlackChatMessageBody = self
            .call("chat.postMessage", || {
                self.http
                    .post(self.endpoint("chat.postMessage"))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;
        Ok(SlackPostedMessage {
            channel: body.channel.unwrap_or_else(|| channel.to_string()),
            ts: body
                .ts
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    /// Adds `name` as a reaction; an existing identical reaction counts as done.
    pub async fn add_reaction(&self, channel: &str, timestamp: &str, name: &str) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "timestamp": timestamp,
            "name": name,
        });
        let response: SlackApiResponse<SlackEmptyBody> = self
            .request_json("reactions.add", || {
                self.http
                    .post(self.endpoint("reactions.add"))
                    .bearer_auth(&self.bot_token)
                    .json(&payload)
            })
            .await?;
        if !response.ok && response.error.as_deref() != Some("already_reacted") {
            bail!(
                "slack reactions.add failed: {}",
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(())
    }

    /// Returns every message of the thread anchored at `thread_ts`, parent
    /// included, in the order Slack reports them.
    pub async fn conversation_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<SlackReplyMessage>> {
        let limit = REPLIES_PAGE_LIMIT.to_string();
        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..REPLIES_MAX_PAGES {
            let mut query = vec![
                ("channel", channel.to_string()),
                ("ts", thread_ts.to_string()),
                ("inclusive", "true".to_string()),
                ("limit", limit.clone()),
            ];
            if let Some(cursor) = cursor.as_ref() {
                query.push(("cursor", cursor.clone()));
            }
            let page: SlackRepliesBody = self
                .call("conversations.replies", || {
                    self.http
                        .get(self.endpoint("conversations.replies"))
                        .bearer_auth(&self.bot_token)
                        .query(&query)
                })
                .await?;
            messages.extend(page.messages);
            cursor = page
                .response_metadata
                .and_then(|metadata| metadata.next_cursor)
                .filter(|value| !value.trim().is_empty());
            if !page.has_more || cursor.is_none() {
                break;
            }
        }
        Ok(messages)
    }

    pub async fn channel_info(&self, channel: &str) -> Result<SlackChannelInfo> {
        let body: SlackConversationInfoBody = self
            .call("conversations.info", || {
                self.http
                    .get(self.endpoint("conversations.info"))
                    .bearer_auth(&self.bot_token)
                    .query(&[("channel", channel)])
            })
            .await?;
        body.channel
            .ok_or_else(|| anyhow!("slack conversations.info response missing channel"))
    }

    pub async fn user_info(&self, user: &str) -> Result<SlackUserInfo> {
        let body: SlackUserInfoBody = self
            .call("users.info", || {
                self.http
                    .get(self.endpoint("users.info"))
                    .bearer_auth(&self.bot_token)
                    .query(&[("user", user)])
            })
            .await?;
        body.user
            .ok_or_else(|| anyhow!("slack users.info response missing user"))
    }

    async fn call<T, F>(&self, method: &str, builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let response: SlackApiResponse<T> = self.request_json(method, builder).await?;
        response.into_body(method)
    }

    async fn request_json<T, F>(&self, method: &str, mut builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header("x-relay-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode slack {method}"));
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_slack_status(status.as_u16())
                    {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "slack api {method} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("slack api {method} request failed"));
                }
            }
        }
    }
}
