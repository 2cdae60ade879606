//! Turns validated CLI options into runtime configuration and starts the relay.

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use relay_actuator::{Actuator, ActuatorQueue, CursorDesktopActuator, CursorDesktopConfig};
use relay_cli::{resolve_non_empty_cli_value, validate_relay_cli, Cli};
use relay_core::{render_instruction_template, InstructionConfig};
use relay_slack_runtime::{run_slack_relay, DeliverySettings, SlackRelayRuntimeConfig};
use tracing::info;

const ACTUATOR_CHECK_NOTIFICATION: &str = "Slack relay actuator check: notifications are working.";

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    validate_relay_cli(&cli)?;
    let actuator = CursorDesktopActuator::new(build_cursor_desktop_config(&cli))
        .context("invalid cursor actuator configuration")?;

    if cli.check_actuator {
        return run_actuator_check(&actuator).await;
    }

    let runtime_config = build_runtime_config(&cli)?;
    let (queue, worker) = ActuatorQueue::spawn(Arc::new(actuator), cli.actuator_queue_capacity);
    info!(
        api_base = %runtime_config.api_base,
        project = ?cli.project_local_path,
        "starting slack cursor relay"
    );
    let result = run_slack_relay(runtime_config, Arc::new(queue)).await;
    worker.abort();
    result
}

pub(crate) async fn run_actuator_check(actuator: &CursorDesktopActuator) -> Result<()> {
    let application = actuator
        .check_availability()
        .await
        .context("cursor is not reachable through osascript")?;
    println!("cursor actuator available: {application}");
    actuator
        .notify_fallback(ACTUATOR_CHECK_NOTIFICATION)
        .await
        .context("failed to show fallback notification")?;
    println!("fallback notification sent");
    Ok(())
}

pub(crate) fn build_instruction_config(cli: &Cli) -> InstructionConfig {
    InstructionConfig {
        target_branch: resolve_non_empty_cli_value(cli.mr_target_branch.as_deref()),
        project_url: resolve_non_empty_cli_value(cli.gitlab_project_url.as_deref()),
        project_id: resolve_non_empty_cli_value(cli.gitlab_project_id.as_deref()),
        demo_base_url: resolve_non_empty_cli_value(cli.demo_base_url.as_deref()),
        extra_labels: cli
            .mr_labels
            .iter()
            .filter_map(|label| resolve_non_empty_cli_value(Some(label)))
            .collect(),
        branch_prefix: cli.branch_prefix.trim().to_string(),
    }
}

pub(crate) fn build_delivery_settings(cli: &Cli) -> DeliverySettings {
    DeliverySettings {
        acknowledgment_text: cli.acknowledgment_text.trim().to_string(),
        processed_reaction: resolve_non_empty_cli_value(Some(&cli.processed_reaction)),
        fallback_summary_chars: cli.fallback_summary_chars.max(1),
        mention_failure_text: cli.mention_failure_text.trim().to_string(),
    }
}

pub(crate) fn build_cursor_desktop_config(cli: &Cli) -> CursorDesktopConfig {
    CursorDesktopConfig {
        osascript_executable: cli.osascript_executable.trim().to_string(),
        cursor_cli_path: cli.cursor_cli_path.clone(),
        project_path: cli.project_local_path.clone(),
        delay_scale: cli.actuator_delay_scale,
        script_timeout_ms: cli.actuator_timeout_ms.max(1),
        project_open_settle_ms: cli.project_open_settle_ms,
    }
}

pub(crate) fn build_runtime_config(cli: &Cli) -> Result<SlackRelayRuntimeConfig> {
    let bot_token = resolve_non_empty_cli_value(cli.slack_bot_token.as_deref())
        .ok_or_else(|| anyhow!("--slack-bot-token (SLACK_BOT_TOKEN) is required"))?;
    let app_token = resolve_non_empty_cli_value(cli.slack_app_token.as_deref())
        .ok_or_else(|| anyhow!("--slack-app-token (SLACK_APP_TOKEN) is required"))?;

    Ok(SlackRelayRuntimeConfig {
        api_base: cli.slack_api_base.trim().to_string(),
        app_token,
        bot_token,
        bot_user_id: resolve_non_empty_cli_value(cli.slack_bot_user_id.as_deref()),
        request_timeout_ms: cli.slack_request_timeout_ms.max(1),
        retry_max_attempts: cli.slack_retry_max_attempts.max(1),
        retry_base_delay_ms: cli.slack_retry_base_delay_ms.max(1),
        reconnect_delay: Duration::from_millis(cli.slack_reconnect_delay_ms.max(1)),
        processed_event_cap: cli.slack_processed_event_cap.max(1),
        static_rules: render_instruction_template(&build_instruction_config(cli)),
        delivery: build_delivery_settings(cli),
    })
}
