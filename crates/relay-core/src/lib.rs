//! Core data model and prompt assembly for the Slack-to-Cursor relay.
//!
//! Everything in this crate is pure: chat events, thread context records, the
//! instruction template and the prompt assembler never perform I/O, so the
//! transport and actuator crates can share them without extra plumbing.

pub mod chat_event;
pub mod delivery_defaults;
pub mod instruction_template;
pub mod prompt_assembler;
pub mod text_utils;
pub mod time_utils;

pub use chat_event::{ChatEvent, ChatEventKind, DeliveryOutcome, ThreadMessage};
pub use delivery_defaults::{
    DEFAULT_ACKNOWLEDGMENT_TEXT, DEFAULT_FALLBACK_SUMMARY_CHARS, DEFAULT_MENTION_FAILURE_TEXT,
    DEFAULT_PROCESSED_REACTION, DEFAULT_SLACK_API_BASE,
};
pub use instruction_template::{render_instruction_template, InstructionConfig, DEFAULT_MR_LABEL};
pub use prompt_assembler::{
    assemble_prompt, render_delivery_instruction, render_thread_context,
    PROMPT_SECTION_SEPARATOR, THREAD_CONTEXT_HEADER,
};
pub use text_utils::{neutralize_delivery_directives, truncate_for_error, truncate_for_summary};
pub use time_utils::format_slack_timestamp;
