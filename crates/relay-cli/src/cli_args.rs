use std::path::PathBuf;

use clap::Parser;
use relay_core::{
    DEFAULT_ACKNOWLEDGMENT_TEXT, DEFAULT_FALLBACK_SUMMARY_CHARS, DEFAULT_MENTION_FAILURE_TEXT,
    DEFAULT_PROCESSED_REACTION, DEFAULT_SLACK_API_BASE,
};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_non_negative_f64(value: &str) -> Result<f64, String> {
    let parsed = value
        .parse::<f64>()
        .map_err(|error| format!("failed to parse float: {error}"))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err("value must be a finite number greater than or equal to 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "slack-cursor-relay",
    about = "Relay Slack messages and mentions into a Cursor Agent session",
    version
)]
pub struct Cli {
    #[arg(
        long = "slack-bot-token",
        env = "SLACK_BOT_TOKEN",
        hide_env_values = true,
        help = "Slack bot token for Web API calls (xoxb-...)"
    )]
    pub slack_bot_token: Option<String>,

    #[arg(
        long = "slack-app-token",
        env = "SLACK_APP_TOKEN",
        hide_env_values = true,
        help = "Slack Socket Mode app token (xapp-...)"
    )]
    pub slack_app_token: Option<String>,

    #[arg(
        long = "slack-bot-user-id",
        env = "SLACK_BOT_USER_ID",
        help = "Bot user id; resolved through auth.test when omitted"
    )]
    pub slack_bot_user_id: Option<String>,

    #[arg(
        long = "slack-api-base",
        env = "SLACK_API_BASE",
        default_value = DEFAULT_SLACK_API_BASE,
        help = "Slack Web API base URL"
    )]
    pub slack_api_base: String,

    #[arg(
        long = "slack-request-timeout-ms",
        env = "RELAY_SLACK_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        help = "Timeout for individual Slack Web API requests"
    )]
    pub slack_request_timeout_ms: u64,

    #[arg(
        long = "slack-retry-max-attempts",
        env = "RELAY_SLACK_RETRY_MAX_ATTEMPTS",
        default_value_t = 4,
        help = "Maximum attempts for retryable slack api failures (429/5xx/transport)"
    )]
    pub slack_retry_max_attempts: usize,

    #[arg(
        long = "slack-retry-base-delay-ms",
        env = "RELAY_SLACK_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base backoff delay in milliseconds for slack api retries"
    )]
    pub slack_retry_base_delay_ms: u64,

    #[arg(
        long = "slack-reconnect-delay-ms",
        env = "RELAY_SLACK_RECONNECT_DELAY_MS",
        default_value_t = 1_000,
        help = "Delay before reconnecting after socket/session errors"
    )]
    pub slack_reconnect_delay_ms: u64,

    #[arg(
        long = "slack-processed-event-cap",
        env = "RELAY_SLACK_PROCESSED_EVENT_CAP",
        default_value_t = 10_000,
        help = "Maximum event keys remembered for duplicate delivery protection"
    )]
    pub slack_processed_event_cap: usize,

    #[arg(
        long = "acknowledgment-text",
        env = "RELAY_ACKNOWLEDGMENT_TEXT",
        default_value = DEFAULT_ACKNOWLEDGMENT_TEXT,
        help = "Reply posted to the thread as soon as a request is received"
    )]
    pub acknowledgment_text: String,

    #[arg(
        long = "processed-reaction",
        env = "RELAY_PROCESSED_REACTION",
        default_value = DEFAULT_PROCESSED_REACTION,
        help = "Reaction added to the request after delivery succeeds (empty disables)"
    )]
    pub processed_reaction: String,

    #[arg(
        long = "mention-failure-text",
        env = "RELAY_MENTION_FAILURE_TEXT",
        default_value = DEFAULT_MENTION_FAILURE_TEXT,
        help = "Reply posted to a mention thread when delivery to Cursor fails"
    )]
    pub mention_failure_text: String,

    #[arg(
        long = "fallback-summary-chars",
        env = "RELAY_FALLBACK_SUMMARY_CHARS",
        default_value_t = DEFAULT_FALLBACK_SUMMARY_CHARS,
        value_parser = parse_positive_usize,
        help = "Maximum characters of the prompt shown in the fallback notification"
    )]
    pub fallback_summary_chars: usize,

    #[arg(
        long = "project-local-path",
        env = "PROJECT_LOCAL_PATH",
        help = "Project directory opened in Cursor before each delivery"
    )]
    pub project_local_path: Option<PathBuf>,

    #[arg(
        long = "mr-target-branch",
        env = "GITLAB_MR_TARGET_BRANCH",
        help = "Target branch for merge requests created by the assistant"
    )]
    pub mr_target_branch: Option<String>,

    #[arg(
        long = "gitlab-project-url",
        env = "GITLAB_PROJECT_URL",
        help = "GitLab project URL referenced by the instruction template"
    )]
    pub gitlab_project_url: Option<String>,

    #[arg(
        long = "gitlab-project-id",
        env = "GITLAB_PROJECT_ID",
        help = "GitLab project id referenced by the instruction template"
    )]
    pub gitlab_project_id: Option<String>,

    #[arg(
        long = "demo-base-url",
        env = "SAMPLE_DEMO_URL",
        help = "Base URL used to build preview links"
    )]
    pub demo_base_url: Option<String>,

    #[arg(
        long = "mr-label",
        env = "GITLAB_MR_LABEL",
        value_delimiter = ',',
        help = "Extra merge request labels (comma-separated) added to the default label"
    )]
    pub mr_labels: Vec<String>,

    #[arg(
        long = "branch-prefix",
        env = "RELAY_BRANCH_PREFIX",
        default_value = "bot/",
        help = "Prefix for branches the assistant creates"
    )]
    pub branch_prefix: String,

    #[arg(
        long = "osascript-executable",
        env = "RELAY_OSASCRIPT",
        default_value = "osascript",
        help = "AppleScript runner used to drive Cursor"
    )]
    pub osascript_executable: String,

    #[arg(
        long = "cursor-cli-path",
        env = "RELAY_CURSOR_CLI_PATH",
        default_value = "/Applications/Cursor.app/Contents/Resources/app/bin/cursor",
        help = "Cursor command line launcher used to open the project"
    )]
    pub cursor_cli_path: PathBuf,

    #[arg(
        long = "actuator-delay-scale",
        env = "RELAY_ACTUATOR_DELAY_SCALE",
        default_value_t = 1.0,
        value_parser = parse_non_negative_f64,
        help = "Multiplier applied to the pauses between Cursor UI steps"
    )]
    pub actuator_delay_scale: f64,

    #[arg(
        long = "actuator-timeout-ms",
        env = "RELAY_ACTUATOR_TIMEOUT_MS",
        default_value_t = 30_000,
        help = "Timeout for each osascript or Cursor CLI invocation"
    )]
    pub actuator_timeout_ms: u64,

    #[arg(
        long = "project-open-settle-ms",
        env = "RELAY_PROJECT_OPEN_SETTLE_MS",
        default_value_t = 1_500,
        help = "Pause after opening the project before typing into Cursor"
    )]
    pub project_open_settle_ms: u64,

    #[arg(
        long = "actuator-queue-capacity",
        env = "RELAY_ACTUATOR_QUEUE_CAPACITY",
        default_value_t = 32,
        help = "Pending deliveries buffered ahead of the Cursor actuator"
    )]
    pub actuator_queue_capacity: usize,

    #[arg(
        long = "check-actuator",
        default_value_t = false,
        help = "Check that Cursor is reachable, show a test notification, and exit"
    )]
    pub check_actuator: bool,

    #[arg(
        long = "debug",
        env = "DEBUG_MODE",
        default_value_t = false,
        help = "Enable debug logging (RUST_LOG still takes precedence)"
    )]
    pub debug: bool,
}
