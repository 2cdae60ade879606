//! Slack Socket Mode runtime that relays chat requests to Cursor.
//!
//! Hosts the Slack Web API client, thread context fetching, the per-event
//! delivery orchestrator and the socket transport loop that feeds it.

mod slack_helpers;
pub mod slack_runtime;

pub use slack_runtime::{
    fetch_thread_context, handle_chat_event, normalize_socket_envelope, parse_socket_envelope,
    run_slack_relay, DeliverySettings, EventHandlingReport, RelayContext, SkipReason,
    SlackApiClient, SlackRelayRuntime, SlackRelayRuntimeConfig, SlackSocketEnvelope,
    DEFAULT_ACKNOWLEDGMENT_TEXT, DEFAULT_FALLBACK_SUMMARY_CHARS, DEFAULT_MENTION_FAILURE_TEXT,
    DEFAULT_PROCESSED_REACTION, DEFAULT_SLACK_API_BASE,
};
