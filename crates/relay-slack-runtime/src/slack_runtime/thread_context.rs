use std::collections::HashMap;

use tracing::{debug, warn};

use super::slack_api_client::{SlackApiClient, SlackReplyMessage, SlackUserInfo};
use relay_core::{format_slack_timestamp, ThreadMessage};

const UNKNOWN_AUTHOR: &str = "unknown";

/// Fetches the conversation history of the thread anchored at `thread_ts`.
///
/// Returns `None` for top-level messages, for single-message threads and
/// whenever the history call fails. Context is advisory; a missing thread
/// never blocks delivery.
pub async fn fetch_thread_context(
    client: &SlackApiClient,
    channel_id: &str,
    thread_ts: Option<&str>,
) -> Option<Vec<ThreadMessage>> {
    let thread_ts = thread_ts
        .map(str::trim)
        .filter(|value| !value.is_empty())?;

    let replies = match client.conversation_replies(channel_id, thread_ts).await {
        Ok(replies) => replies,
        Err(error) => {
            warn!(
                channel = channel_id,
                thread_ts,
                error = %format!("{error:#}"),
                "thread context fetch failed; continuing without context"
            );
            return None;
        }
    };
    if replies.len() <= 1 {
        debug!(
            channel = channel_id,
            thread_ts,
            message_count = replies.len(),
            "thread has no prior conversation"
        );
        return None;
    }

    let mut display_names: HashMap<String, String> = HashMap::new();
    let mut messages = Vec::with_capacity(replies.len());
    for reply in &replies {
        let author_display_name = resolve_author_display_name(client, reply, &mut display_names).await;
        messages.push(ThreadMessage {
            author_display_name,
            timestamp_label: format_slack_timestamp(&reply.ts),
            text: reply.text.clone(),
        });
    }
    Some(messages)
}

async fn resolve_author_display_name(
    client: &SlackApiClient,
    reply: &SlackReplyMessage,
    cache: &mut HashMap<String, String>,
) -> String {
    let Some(user_id) = reply
        .user
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return reply
            .username
            .as_deref()
            .or(reply.bot_id.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string();
    };

    if let Some(cached) = cache.get(user_id) {
        return cached.clone();
    }
    match client.user_info(user_id).await {
        Ok(user) => {
            let display_name = display_name_for_user(&user);
            cache.insert(user_id.to_string(), display_name.clone());
            display_name
        }
        Err(error) => {
            warn!(
                user = user_id,
                error = %format!("{error:#}"),
                "user lookup failed; using raw user id"
            );
            user_id.to_string()
        }
    }
}

/// Prefers the full name, then the handle, then the raw id.
pub(super) fn display_name_for_user(user: &SlackUserInfo) -> String {
    [user.real_name.as_deref(), user.name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(user.id.as_str())
        .to_string()
}
