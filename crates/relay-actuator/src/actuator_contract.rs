use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("invalid actuator configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u64 },
    #[error("'{program}' failed with status {status}: {detail}")]
    ProcessFailed {
        program: String,
        status: String,
        detail: String,
    },
    #[error("actuator io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("actuator queue is closed")]
    QueueClosed,
}

/// Capability that delivers a prompt to the target assistant application.
///
/// Both calls are best-effort: callers log failures and never retry.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Hands `payload` to the target application.
    async fn deliver(&self, payload: &str) -> Result<(), ActuatorError>;

    /// Surfaces `summary` to the user after a failed delivery.
    async fn notify_fallback(&self, summary: &str) -> Result<(), ActuatorError>;
}
