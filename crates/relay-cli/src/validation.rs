use anyhow::{bail, Result};

use crate::Cli;

pub fn resolve_non_empty_cli_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Rejects configurations the relay cannot start with. `--check-actuator`
/// only needs the actuator settings, so Slack credentials are not required
/// in that mode.
pub fn validate_relay_cli(cli: &Cli) -> Result<()> {
    validate_actuator_cli(cli)?;
    if cli.check_actuator {
        return Ok(());
    }

    if resolve_non_empty_cli_value(cli.slack_bot_token.as_deref()).is_none() {
        bail!("--slack-bot-token (SLACK_BOT_TOKEN) is required");
    }
    if resolve_non_empty_cli_value(cli.slack_app_token.as_deref()).is_none() {
        bail!("--slack-app-token (SLACK_APP_TOKEN) is required");
    }
    let api_base = cli.slack_api_base.trim();
    if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
        bail!("--slack-api-base must be an http(s) url");
    }
    if cli.slack_request_timeout_ms == 0 {
        bail!("--slack-request-timeout-ms must be greater than 0");
    }
    if cli.slack_retry_max_attempts == 0 {
        bail!("--slack-retry-max-attempts must be greater than 0");
    }
    if cli.slack_retry_base_delay_ms == 0 {
        bail!("--slack-retry-base-delay-ms must be greater than 0");
    }
    if cli.slack_reconnect_delay_ms == 0 {
        bail!("--slack-reconnect-delay-ms must be greater than 0");
    }
    if cli.slack_processed_event_cap == 0 {
        bail!("--slack-processed-event-cap must be greater than 0");
    }
    if cli.acknowledgment_text.trim().is_empty() {
        bail!("--acknowledgment-text cannot be empty");
    }
    if cli.mention_failure_text.trim().is_empty() {
        bail!("--mention-failure-text cannot be empty");
    }
    if cli.processed_reaction.contains(':') || cli.processed_reaction.contains(char::is_whitespace)
    {
        bail!("--processed-reaction must be a bare emoji name such as robot_face");
    }
    Ok(())
}

fn validate_actuator_cli(cli: &Cli) -> Result<()> {
    if cli.osascript_executable.trim().is_empty() {
        bail!("--osascript-executable cannot be empty");
    }
    if cli.actuator_timeout_ms == 0 {
        bail!("--actuator-timeout-ms must be greater than 0");
    }
    if cli.actuator_queue_capacity == 0 {
        bail!("--actuator-queue-capacity must be greater than 0");
    }
    if let Some(project_path) = cli.project_local_path.as_ref() {
        if project_path.as_os_str().is_empty() {
            bail!("--project-local-path cannot be empty");
        }
    }
    Ok(())
}
