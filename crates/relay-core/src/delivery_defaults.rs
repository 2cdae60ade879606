//! Defaults shared by the CLI surface and the delivery pipeline.

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_ACKNOWLEDGMENT_TEXT: &str =
    ":brain: I'm creating the MR and Preview URL based on your request...";
pub const DEFAULT_PROCESSED_REACTION: &str = "robot_face";
pub const DEFAULT_FALLBACK_SUMMARY_CHARS: usize = 100;
pub const DEFAULT_MENTION_FAILURE_TEXT: &str = "Sorry, there was an error processing your message.";
