//! Per-event pipeline: acknowledge, gather context, assemble, deliver.
//!
//! Acknowledgment, channel lookup, context fetch, the processed reaction and
//! the mention failure reply are advisory. Their failures are logged and the
//! pipeline keeps going. Only the actuator outcome decides between the success
//! and fallback branches.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::slack_api_client::{SlackApiClient, SlackChannelInfo};
use super::thread_context::fetch_thread_context;
use super::SlackRelayRuntimeConfig;
use relay_actuator::Actuator;
use relay_core::{
    assemble_prompt, truncate_for_summary, ChatEvent, DeliveryOutcome,
    DEFAULT_ACKNOWLEDGMENT_TEXT, DEFAULT_FALLBACK_SUMMARY_CHARS, DEFAULT_MENTION_FAILURE_TEXT,
    DEFAULT_PROCESSED_REACTION,
};
const DIRECT_MESSAGE_CHANNEL_NAME: &str = "Direct Message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySettings {
    pub acknowledgment_text: String,
    /// Reaction added after a successful delivery; `None` disables it.
    pub processed_reaction: Option<String>,
    pub fallback_summary_chars: usize,
    pub mention_failure_text: String,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            acknowledgment_text: DEFAULT_ACKNOWLEDGMENT_TEXT.to_string(),
            processed_reaction: Some(DEFAULT_PROCESSED_REACTION.to_string()),
            fallback_summary_chars: DEFAULT_FALLBACK_SUMMARY_CHARS,
            mention_failure_text: DEFAULT_MENTION_FAILURE_TEXT.to_string(),
        }
    }
}

/// Everything an event task needs, cloned into each task.
#[derive(Clone)]
pub struct RelayContext {
    slack_client: SlackApiClient,
    actuator: Arc<dyn Actuator>,
    static_rules: Arc<str>,
    settings: Arc<DeliverySettings>,
    bot_user_id: String,
}

impl RelayContext {
    pub fn new(
        slack_client: SlackApiClient,
        actuator: Arc<dyn Actuator>,
        static_rules: &str,
        settings: DeliverySettings,
        bot_user_id: String,
    ) -> Self {
        Self {
            slack_client,
            actuator,
            static_rules: Arc::from(static_rules),
            settings: Arc::new(settings),
            bot_user_id,
        }
    }

    /// Builds the Slack client and resolves the bot identity through
    /// `auth.test` unless one was configured.
    pub async fn connect(
        config: &SlackRelayRuntimeConfig,
        actuator: Arc<dyn Actuator>,
    ) -> Result<Self> {
        let slack_client = SlackApiClient::new(
            config.api_base.clone(),
            config.app_token.clone(),
            config.bot_token.clone(),
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;
        let configured_bot_user_id = config
            .bot_user_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);
        let bot_user_id = match configured_bot_user_id {
            Some(bot_user_id) => bot_user_id,
            None => slack_client
                .resolve_bot_user_id()
                .await
                .context("failed to resolve slack bot user id")?,
        };
        Ok(Self::new(
            slack_client,
            actuator,
            &config.static_rules,
            config.delivery.clone(),
            bot_user_id,
        ))
    }

    pub fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    pub fn slack_client(&self) -> &SlackApiClient {
        &self.slack_client
    }

    fn skip_reason(&self, event: &ChatEvent) -> Option<SkipReason> {
        if event.author_id == self.bot_user_id {
            return Some(SkipReason::SelfAuthored);
        }
        if event.automated {
            return Some(SkipReason::Automated);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SelfAuthored,
    Automated,
}

/// What happened to one event. Returned for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHandlingReport {
    pub event_key: String,
    pub effective_thread_ts: String,
    pub skipped: Option<SkipReason>,
    pub acknowledged: bool,
    pub context_messages: usize,
    pub delivery: Option<DeliveryOutcome>,
    pub fallback_notified: bool,
    pub marked_processed: bool,
    pub failure_reply_posted: bool,
}

impl EventHandlingReport {
    fn new(event: &ChatEvent) -> Self {
        Self {
            event_key: event.idempotency_key(),
            effective_thread_ts: event.effective_thread_ts().to_string(),
            skipped: None,
            acknowledged: false,
            context_messages: 0,
            delivery: None,
            fallback_notified: false,
            marked_processed: false,
            failure_reply_posted: false,
        }
    }
}

pub async fn handle_chat_event(context: &RelayContext, event: &ChatEvent) -> EventHandlingReport {
    let mut report = EventHandlingReport::new(event);
    if let Some(reason) = context.skip_reason(event) {
        debug!(event_key = %report.event_key, reason = ?reason, "skipping slack event");
        report.skipped = Some(reason);
        return report;
    }

    info!(
        event_key = %report.event_key,
        kind = event.kind.as_str(),
        channel = %event.channel_id,
        thread_ts = %report.effective_thread_ts,
        "relaying slack event"
    );

    report.acknowledged = log_advisory(
        "acknowledgment",
        &report.event_key,
        post_acknowledgment(context, event).await,
    );

    let channel_name = resolve_channel_name(context.slack_client(), &event.channel_id).await;
    let thread_context = fetch_thread_context(
        context.slack_client(),
        &event.channel_id,
        event.thread_ts.as_deref(),
    )
    .await;
    report.context_messages = thread_context.as_ref().map_or(0, Vec::len);

    let prompt = assemble_prompt(
        &context.static_rules,
        thread_context.as_deref(),
        event,
        &channel_name,
    );
    debug!(event_key = %report.event_key, prompt_chars = prompt.chars().count(), "prompt assembled");

    let outcome = match context.actuator.deliver(&prompt).await {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(error) => DeliveryOutcome::Failed {
            reason: error.to_string(),
        },
    };

    match &outcome {
        DeliveryOutcome::Delivered => {
            info!(event_key = %report.event_key, "prompt delivered to cursor");
            report.marked_processed = log_advisory(
                "processed reaction",
                &report.event_key,
                mark_processed(context, event).await,
            );
        }
        DeliveryOutcome::Failed { reason } => {
            error!(event_key = %report.event_key, reason = %reason, "prompt delivery failed");
            let summary = truncate_for_summary(&prompt, context.settings.fallback_summary_chars);
            match context.actuator.notify_fallback(&summary).await {
                Ok(()) => report.fallback_notified = true,
                Err(fallback_error) => warn!(
                    event_key = %report.event_key,
                    error = %fallback_error,
                    "fallback notification failed"
                ),
            }
            if event.is_mention() {
                report.failure_reply_posted = log_advisory(
                    "mention failure reply",
                    &report.event_key,
                    post_mention_failure_reply(context, event).await,
                );
            }
        }
    }

    report.delivery = Some(outcome);
    report
}

async fn post_acknowledgment(context: &RelayContext, event: &ChatEvent) -> Result<()> {
    context
        .slack_client()
        .post_message(
            &event.channel_id,
            &context.settings.acknowledgment_text,
            Some(event.effective_thread_ts()),
        )
        .await?;
    Ok(())
}

async fn mark_processed(context: &RelayContext, event: &ChatEvent) -> Result<()> {
    let Some(reaction) = context.settings.processed_reaction.as_deref() else {
        return Ok(());
    };
    context
        .slack_client()
        .add_reaction(&event.channel_id, &event.ts, reaction)
        .await
}

async fn post_mention_failure_reply(context: &RelayContext, event: &ChatEvent) -> Result<()> {
    context
        .slack_client()
        .post_message(
            &event.channel_id,
            &context.settings.mention_failure_text,
            Some(event.effective_thread_ts()),
        )
        .await?;
    Ok(())
}

fn log_advisory(operation: &'static str, event_key: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            warn!(
                operation,
                event_key,
                error = %format!("{error:#}"),
                "advisory slack operation failed"
            );
            false
        }
    }
}

async fn resolve_channel_name(client: &SlackApiClient, channel_id: &str) -> String {
    match client.channel_info(channel_id).await {
        Ok(info) => channel_display_name(&info),
        Err(error) if is_direct_message_channel(channel_id) => {
            debug!(channel = channel_id, error = %format!("{error:#}"), "dm channel lookup failed");
            DIRECT_MESSAGE_CHANNEL_NAME.to_string()
        }
        Err(error) => {
            warn!(
                channel = channel_id,
                error = %format!("{error:#}"),
                "channel lookup failed; using raw channel id"
            );
            channel_id.to_string()
        }
    }
}

fn is_direct_message_channel(channel_id: &str) -> bool {
    channel_id.starts_with('D')
}

pub(super) fn channel_display_name(info: &SlackChannelInfo) -> String {
    if let Some(name) = info
        .name
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return name.to_string();
    }
    if info.is_im || is_direct_message_channel(&info.id) {
        return DIRECT_MESSAGE_CHANNEL_NAME.to_string();
    }
    info.id.clone()
}
