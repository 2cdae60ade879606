//! Prompt assembly for relayed chat events.
//!
//! The assembled prompt is, in order: the static rules block, the rendered
//! thread context (only when the thread has more than the triggering message),
//! the triggering message, and exactly one delivery-target instruction naming
//! the channel and thread the assistant must reply to.

use crate::chat_event::{ChatEvent, ThreadMessage};
use crate::text_utils::neutralize_delivery_directives;

pub const PROMPT_SECTION_SEPARATOR: &str = "\n\n---\n\n";
pub const THREAD_CONTEXT_HEADER: &str = "**Thread Context:**";

/// Renders thread history as `- <name> (<timestamp>): <text>` lines in source
/// order. A thread of zero or one message carries no context.
pub fn render_thread_context(messages: &[ThreadMessage]) -> Option<String> {
    if messages.len() <= 1 {
        return None;
    }
    let mut lines = Vec::with_capacity(messages.len() + 1);
    lines.push(THREAD_CONTEXT_HEADER.to_string());
    for message in messages {
        lines.push(format!(
            "- {} ({}): {}",
            neutralize_delivery_directives(&message.author_display_name),
            message.timestamp_label,
            neutralize_delivery_directives(&message.text)
        ));
    }
    Some(lines.join("\n"))
}

pub fn render_delivery_instruction(channel_id: &str, thread_ts: &str) -> String {
    format!(
        "Send the final result as a NEW REPLY MESSAGE to the thread using tool slack_reply_to_thread with channel_id={channel_id}, thread_ts={thread_ts}. Do not edit existing messages - create a new reply in the thread."
    )
}

fn render_triggering_message(event: &ChatEvent, channel_name: &str) -> String {
    let text = event.text.trim();
    let text = if text.is_empty() {
        "(empty message)".to_string()
    } else {
        neutralize_delivery_directives(text)
    };
    format!(
        "**Slack {} from <@{}> in #{}:**\n\n{}",
        event.header_label(),
        event.author_id,
        neutralize_delivery_directives(channel_name),
        text
    )
}

/// Builds the payload handed to the actuator. Pure: identical inputs always
/// yield byte-identical output.
pub fn assemble_prompt(
    static_rules: &str,
    thread_context: Option<&[ThreadMessage]>,
    event: &ChatEvent,
    channel_name: &str,
) -> String {
    let mut prompt = String::new();
    let static_rules = static_rules.trim();
    if !static_rules.is_empty() {
        prompt.push_str(static_rules);
        prompt.push_str(PROMPT_SECTION_SEPARATOR);
    }

    if let Some(context_block) = thread_context.and_then(render_thread_context) {
        prompt.push_str(&context_block);
        prompt.push_str(PROMPT_SECTION_SEPARATOR);
    }

    prompt.push_str(&render_triggering_message(event, channel_name));
    prompt.push_str("\n\n");
    prompt.push_str(&render_delivery_instruction(
        &event.channel_id,
        event.effective_thread_ts(),
    ));
    prompt
}
