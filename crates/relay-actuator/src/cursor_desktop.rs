//! Cursor desktop actuator driven through `osascript` and the Cursor CLI.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::truncate_for_error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::actuator_contract::{Actuator, ActuatorError};
use crate::applescript::{
    render_activate_script, render_availability_script, render_delivery_script,
    render_fallback_notification_script,
};

pub const DEFAULT_CURSOR_CLI_PATH: &str =
    "/Applications/Cursor.app/Contents/Resources/app/bin/cursor";

#[derive(Debug, Clone, PartialEq)]
pub struct CursorDesktopConfig {
    pub osascript_executable: String,
    pub cursor_cli_path: PathBuf,
    /// Workspace opened before each delivery; advisory only.
    pub project_path: Option<PathBuf>,
    pub delay_scale: f64,
    pub script_timeout_ms: u64,
    pub project_open_settle_ms: u64,
}

impl Default for CursorDesktopConfig {
    fn default() -> Self {
        Self {
            osascript_executable: "osascript".to_string(),
            cursor_cli_path: PathBuf::from(DEFAULT_CURSOR_CLI_PATH),
            project_path: None,
            delay_scale: 1.0,
            script_timeout_ms: 30_000,
            project_open_settle_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CursorDesktopActuator {
    config: CursorDesktopConfig,
}

impl CursorDesktopActuator {
    pub fn new(config: CursorDesktopConfig) -> Result<Self, ActuatorError> {
        if config.osascript_executable.trim().is_empty() {
            return Err(ActuatorError::InvalidConfig(
                "osascript executable is empty".to_string(),
            ));
        }
        if config.script_timeout_ms == 0 {
            return Err(ActuatorError::InvalidConfig(
                "script timeout must be greater than 0ms".to_string(),
            ));
        }
        if !config.delay_scale.is_finite() || config.delay_scale < 0.0 {
            return Err(ActuatorError::InvalidConfig(format!(
                "delay scale must be a finite non-negative number, got {}",
                config.delay_scale
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &CursorDesktopConfig {
        &self.config
    }

    /// Asks Cursor for its application name; fails when it cannot be scripted.
    pub async fn check_availability(&self) -> Result<String, ActuatorError> {
        let output = self.run_script(&render_availability_script()).await?;
        Ok(output.trim().to_string())
    }

    async fn run_script(&self, script: &str) -> Result<String, ActuatorError> {
        run_process(
            OsStr::new(&self.config.osascript_executable),
            &[OsString::from("-")],
            Some(script),
            self.config.script_timeout_ms,
        )
        .await
    }

    async fn prepare_workspace(&self) {
        let Some(project_path) = self.config.project_path.as_deref() else {
            return;
        };
        match self.open_project_with_cli(project_path).await {
            Ok(()) => info!(
                project = %project_path.display(),
                "cursor opened project via cli"
            ),
            Err(error) => {
                warn!(
                    project = %project_path.display(),
                    error = %error,
                    "cursor cli failed to open project, activating cursor instead"
                );
                if let Err(error) = self
                    .run_script(&render_activate_script(self.config.delay_scale))
                    .await
                {
                    warn!(error = %error, "failed to activate cursor before delivery");
                }
            }
        }
    }

    async fn open_project_with_cli(&self, project_path: &Path) -> Result<(), ActuatorError> {
        run_process(
            self.config.cursor_cli_path.as_os_str(),
            &[project_path.as_os_str().to_os_string()],
            None,
            self.config.script_timeout_ms,
        )
        .await?;
        if self.config.project_open_settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.project_open_settle_ms)).await;
        }
        Ok(())
    }
}

#[async_trait]
impl Actuator for CursorDesktopActuator {
    async fn deliver(&self, payload: &str) -> Result<(), ActuatorError> {
        self.prepare_workspace().await;
        self.run_script(&render_delivery_script(payload, self.config.delay_scale))
            .await?;
        info!(payload_chars = payload.chars().count(), "prompt delivered to cursor");
        Ok(())
    }

    async fn notify_fallback(&self, summary: &str) -> Result<(), ActuatorError> {
        self.run_script(&render_fallback_notification_script(summary))
            .await?;
        info!("fallback notification shown");
        Ok(())
    }
}

async fn run_process(
    program: &OsStr,
    args: &[OsString],
    stdin_payload: Option<&str>,
    timeout_ms: u64,
) -> Result<String, ActuatorError> {
    let program_label = program.to_string_lossy().to_string();
    let mut command = Command::new(program);
    command.kill_on_drop(true);
    command.args(args);
    command.stdin(if stdin_payload.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|source| ActuatorError::Spawn {
        program: program_label.clone(),
        source,
    })?;
    debug!(program = %program_label, "actuator process spawned");

    let stdin = child.stdin.take();
    let run = async move {
        if let (Some(mut stdin), Some(payload)) = (stdin, stdin_payload) {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        child.wait_with_output().await
    };
    let output = tokio::time::timeout(Duration::from_millis(timeout_ms), run)
        .await
        .map_err(|_| ActuatorError::Timeout {
            program: program_label.clone(),
            timeout_ms,
        })??;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let status = output
            .status
            .code()
            .map(|value| value.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(ActuatorError::ProcessFailed {
            program: program_label,
            status,
            detail: summarize_process_failure(&stderr, &stdout),
        });
    }
    Ok(stdout)
}

fn summarize_process_failure(stderr: &str, stdout: &str) -> String {
    let detail = [stderr.trim(), stdout.trim()]
        .into_iter()
        .find(|value| !value.is_empty())
        .unwrap_or("no output");
    truncate_for_error(detail, 400)
}
