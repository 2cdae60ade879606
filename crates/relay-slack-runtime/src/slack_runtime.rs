//! Slack Socket Mode runtime that turns chat events into Cursor deliveries.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinSet;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use crate::slack_helpers::{mentions_bot_user, strip_bot_mention};
use relay_actuator::Actuator;
use relay_core::{ChatEvent, ChatEventKind};

mod delivery_orchestrator;
mod processed_events;
mod slack_api_client;
mod thread_context;

pub use delivery_orchestrator::{
    handle_chat_event, DeliverySettings, EventHandlingReport, RelayContext, SkipReason,
};
pub use relay_core::{
    DEFAULT_ACKNOWLEDGMENT_TEXT, DEFAULT_FALLBACK_SUMMARY_CHARS, DEFAULT_MENTION_FAILURE_TEXT,
    DEFAULT_PROCESSED_REACTION, DEFAULT_SLACK_API_BASE,
};
pub use slack_api_client::{
    SlackApiClient, SlackChannelInfo, SlackPostedMessage, SlackReplyMessage, SlackUserInfo,
};
pub use thread_context::fetch_thread_context;

use processed_events::ProcessedEventGuard;

/// Message subtypes that still carry a human request.
const RELAYED_MESSAGE_SUBTYPES: [&str; 3] = ["thread_broadcast", "file_share", "me_message"];

/// Runtime configuration for the Slack relay transport loop.
#[derive(Debug, Clone)]
pub struct SlackRelayRuntimeConfig {
    pub api_base: String,
    pub app_token: String,
    pub bot_token: String,
    pub bot_user_id: Option<String>,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub reconnect_delay: Duration,
    pub processed_event_cap: usize,
    /// Rendered instruction template placed at the top of every prompt.
    pub static_rules: String,
    pub delivery: DeliverySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackSocketEnvelope {
    #[serde(default)]
    pub envelope_id: String,
    #[serde(rename = "type")]
    pub envelope_type: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
struct SlackEventCallbackEnvelope {
    #[serde(rename = "type")]
    callback_type: String,
    #[serde(default)]
    event_id: Option<String>,
    event: SlackEventPayload,
}

#[derive(Debug, Deserialize)]
struct SlackEventPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchDecision {
    Ignored,
    Duplicate,
    Dispatched,
}

enum SocketSessionEnd {
    Shutdown,
    Disconnected,
}

pub async fn run_slack_relay(
    config: SlackRelayRuntimeConfig,
    actuator: Arc<dyn Actuator>,
) -> Result<()> {
    let mut runtime = SlackRelayRuntime::new(config, actuator).await?;
    runtime.run().await
}

pub struct SlackRelayRuntime {
    config: SlackRelayRuntimeConfig,
    context: RelayContext,
    processed: ProcessedEventGuard,
    tasks: JoinSet<EventHandlingReport>,
}

impl SlackRelayRuntime {
    pub async fn new(config: SlackRelayRuntimeConfig, actuator: Arc<dyn Actuator>) -> Result<Self> {
        let context = RelayContext::connect(&config, actuator).await?;
        info!(bot_user_id = context.bot_user_id(), "slack relay authenticated");
        let processed = ProcessedEventGuard::new(config.processed_event_cap);
        Ok(Self {
            config,
            context,
            processed,
            tasks: JoinSet::new(),
        })
    }

    pub fn context(&self) -> &RelayContext {
        &self.context
    }

    /// Runs until Ctrl-C. Failing to establish the very first socket session
    /// is fatal; later failures reconnect after `reconnect_delay`.
    pub async fn run(&mut self) -> Result<()> {
        let mut established = false;
        loop {
            match self.context.slack_client().open_socket_connection().await {
                Ok(socket_url) => match self.run_socket_session(&socket_url, &mut established).await
                {
                    Ok(SocketSessionEnd::Shutdown) => {
                        info!("slack relay shutdown requested");
                        self.drain_tasks().await;
                        return Ok(());
                    }
                    Ok(SocketSessionEnd::Disconnected) => {
                        info!("slack socket session ended; reconnecting");
                    }
                    Err(error) if !established => {
                        return Err(error.context("failed to establish slack socket mode session"));
                    }
                    Err(error) => {
                        warn!(error = %format!("{error:#}"), "slack socket session error");
                    }
                },
                Err(error) if !established => {
                    return Err(error.context("failed to open slack socket mode connection"));
                }
                Err(error) => {
                    warn!(error = %format!("{error:#}"), "failed to reopen slack socket connection");
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("slack relay shutdown requested");
                    self.drain_tasks().await;
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    async fn run_socket_session(
        &mut self,
        socket_url: &str,
        established: &mut bool,
    ) -> Result<SocketSessionEnd> {
        let (stream, _response) = connect_async(socket_url)
            .await
            .context("failed to connect slack socket mode websocket")?;
        *established = true;
        info!("slack socket mode connected");
        let (mut sink, mut source) = stream.split();

        loop {
            self.reap_finished_tasks();
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    return Ok(SocketSessionEnd::Shutdown);
                }
                maybe_message = source.next() => {
                    let Some(message_result) = maybe_message else {
                        return Ok(SocketSessionEnd::Disconnected);
                    };
                    let message = message_result.context("failed reading slack websocket message")?;
                    let envelope = match parse_socket_envelope(message) {
                        Ok(Some(envelope)) => envelope,
                        Ok(None) => continue,
                        Err(error) => {
                            warn!(error = %format!("{error:#}"), "dropping malformed slack socket frame");
                            continue;
                        }
                    };
                    if !envelope.envelope_id.is_empty() {
                        ack_envelope(&mut sink, &envelope.envelope_id).await?;
                    }
                    if envelope.envelope_type == "disconnect" {
                        return Ok(SocketSessionEnd::Disconnected);
                    }
                    self.dispatch_envelope(&envelope);
                }
            }
        }
    }

    /// Normalizes `envelope` and spawns a handler task unless it is
    /// irrelevant or already seen.
    pub(crate) fn dispatch_envelope(&mut self, envelope: &SlackSocketEnvelope) -> DispatchDecision {
        let event = match normalize_socket_envelope(envelope, self.context.bot_user_id()) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!(envelope_type = %envelope.envelope_type, "ignoring slack envelope");
                return DispatchDecision::Ignored;
            }
            Err(error) => {
                warn!(error = %format!("{error:#}"), "failed to decode slack event envelope");
                return DispatchDecision::Ignored;
            }
        };

        let event_key = event.idempotency_key();
        if !self.processed.mark_processed(&event_key) {
            info!(event_key = %event_key, "duplicate slack event dropped");
            return DispatchDecision::Duplicate;
        }

        let context = self.context.clone();
        self.tasks
            .spawn(async move { handle_chat_event(&context, &event).await });
        DispatchDecision::Dispatched
    }

    fn reap_finished_tasks(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            log_task_result(joined);
        }
    }

    /// Waits for every in-flight event task.
    pub(crate) async fn drain_tasks(&mut self) -> Vec<EventHandlingReport> {
        let mut reports = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            if let Some(report) = log_task_result(joined) {
                reports.push(report);
            }
        }
        reports
    }
}

fn log_task_result(
    joined: Result<EventHandlingReport, tokio::task::JoinError>,
) -> Option<EventHandlingReport> {
    match joined {
        Ok(report) => {
            debug!(
                event_key = %report.event_key,
                skipped = ?report.skipped,
                delivered = report.delivery.as_ref().is_some_and(|outcome| outcome.is_delivered()),
                "slack event task finished"
            );
            Some(report)
        }
        Err(error) => {
            warn!(error = %error, "slack event task aborted");
            None
        }
    }
}

async fn ack_envelope<S>(sink: &mut S, envelope_id: &str) -> Result<()>
where
    S: futures_util::Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let ack = json!({ "envelope_id": envelope_id }).to_string();
    sink.send(WsMessage::Text(ack.into()))
        .await
        .context("failed to send slack socket ack")
}

pub fn parse_socket_envelope(message: WsMessage) -> Result<Option<SlackSocketEnvelope>> {
    let text = match message {
        WsMessage::Text(text) => text.as_str().to_string(),
        WsMessage::Binary(bytes) => {
            String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            return Ok(None)
        }
    };
    let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
        .context("failed to parse slack socket envelope")?;
    Ok(Some(envelope))
}

/// Maps an `events_api` envelope to a [`ChatEvent`].
///
/// Returns `Ok(None)` for envelopes that carry nothing to relay: non-event
/// envelopes, unsupported event types, edits/deletes/joins and events without
/// a channel, timestamp or author. Bot-authored events are kept and flagged
/// `automated` so the orchestrator's skip policy sees them.
pub fn normalize_socket_envelope(
    envelope: &SlackSocketEnvelope,
    bot_user_id: &str,
) -> Result<Option<ChatEvent>> {
    if envelope.envelope_type != "events_api" {
        return Ok(None);
    }
    let callback = serde_json::from_value::<SlackEventCallbackEnvelope>(envelope.payload.clone())
        .context("failed to decode slack events_api payload")?;
    if callback.callback_type != "event_callback" {
        return Ok(None);
    }

    let event = callback.event;
    let kind = match event.event_type.as_str() {
        "message" => ChatEventKind::Message,
        "app_mention" => ChatEventKind::AppMention,
        _ => return Ok(None),
    };

    let subtype = event.subtype.as_deref();
    let automated = event.bot_id.is_some() || subtype == Some("bot_message");
    if let Some(subtype) = subtype {
        if !automated && !RELAYED_MESSAGE_SUBTYPES.contains(&subtype) {
            debug!(
                event_id = callback.event_id.as_deref().unwrap_or_default(),
                subtype, "ignoring slack message subtype"
            );
            return Ok(None);
        }
    }

    let Some(author_id) = non_empty(event.user).or_else(|| non_empty(event.bot_id)) else {
        return Ok(None);
    };
    let Some(channel_id) = non_empty(event.channel) else {
        return Ok(None);
    };
    let Some(ts) = non_empty(event.ts) else {
        return Ok(None);
    };

    let raw_text = event.text.as_deref().unwrap_or_default();
    Ok(Some(ChatEvent {
        kind,
        channel_id,
        author_id,
        text: strip_bot_mention(raw_text, bot_user_id),
        ts,
        thread_ts: non_empty(event.thread_ts),
        automated,
        mentions_bot: kind == ChatEventKind::AppMention
            || mentions_bot_user(raw_text, bot_user_id),
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
