/// Inbound event flavours the relay reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEventKind {
    Message,
    AppMention,
}

impl ChatEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::AppMention => "app_mention",
        }
    }
}

/// A chat message as delivered by the event source. Never mutated after
/// normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub kind: ChatEventKind,
    pub channel_id: String,
    pub author_id: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    /// Set for bot-posted or otherwise automated messages.
    pub automated: bool,
    /// The raw text addressed the bot, whichever event kind carried it.
    pub mentions_bot: bool,
}

impl ChatEvent {
    /// Thread the relay replies into: the explicit thread when present,
    /// otherwise the message's own timestamp.
    pub fn effective_thread_ts(&self) -> &str {
        self.thread_ts
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.ts.as_str())
    }

    pub fn is_threaded(&self) -> bool {
        matches!(
            self.thread_ts.as_deref().map(str::trim),
            Some(thread_ts) if !thread_ts.is_empty() && thread_ts != self.ts
        )
    }

    /// A `message` and an `app_mention` for one post share an idempotency
    /// key and either may arrive first, so mention handling keys off this
    /// rather than `kind`.
    pub fn is_mention(&self) -> bool {
        self.kind == ChatEventKind::AppMention || self.mentions_bot
    }

    /// Label used in the prompt header (`**Slack Message from ...`).
    pub fn header_label(&self) -> &'static str {
        if self.is_mention() {
            "Mention"
        } else {
            "Message"
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.channel_id, self.ts)
    }
}

/// One historical message of a thread, already resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub author_display_name: String,
    pub timestamp_label: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Delivered => None,
            Self::Failed { reason } => Some(reason.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatEvent, ChatEventKind, DeliveryOutcome};

    fn event(ts: &str, thread_ts: Option<&str>) -> ChatEvent {
        ChatEvent {
            kind: ChatEventKind::Message,
            channel_id: "C1".to_string(),
            author_id: "U1".to_string(),
            text: "build X".to_string(),
            ts: ts.to_string(),
            thread_ts: thread_ts.map(ToOwned::to_owned),
            automated: false,
            mentions_bot: false,
        }
    }

    #[test]
    fn unit_effective_thread_ts_falls_back_to_message_ts() {
        assert_eq!(event("100.1", None).effective_thread_ts(), "100.1");
        assert_eq!(event("100.1", Some("90.0")).effective_thread_ts(), "90.0");
        assert_eq!(event("100.1", Some("  ")).effective_thread_ts(), "100.1");
    }

    #[test]
    fn unit_is_threaded_requires_distinct_thread_ts() {
        assert!(!event("100.1", None).is_threaded());
        assert!(!event("100.1", Some("100.1")).is_threaded());
        assert!(event("100.1", Some("90.0")).is_threaded());
    }

    #[test]
    fn unit_is_mention_covers_messages_that_address_the_bot() {
        let mut plain = event("100.1", None);
        assert!(!plain.is_mention());
        assert_eq!(plain.header_label(), "Message");

        plain.mentions_bot = true;
        assert!(plain.is_mention());
        assert_eq!(plain.header_label(), "Mention");

        let mut mention = event("100.1", None);
        mention.kind = ChatEventKind::AppMention;
        assert!(mention.is_mention());
    }

    #[test]
    fn unit_idempotency_key_combines_channel_and_ts() {
        assert_eq!(event("100.1", Some("90.0")).idempotency_key(), "C1:100.1");
    }

    #[test]
    fn unit_delivery_outcome_reports_failure_reason() {
        assert!(DeliveryOutcome::Delivered.is_delivered());
        assert_eq!(DeliveryOutcome::Delivered.failure_reason(), None);
        let failed = DeliveryOutcome::Failed {
            reason: "osascript exited 1".to_string(),
        };
        assert!(!failed.is_delivered());
        assert_eq!(failed.failure_reason(), Some("osascript exited 1"));
    }
}
