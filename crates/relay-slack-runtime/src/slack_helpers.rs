use std::time::Duration;

const MAX_BACKOFF_EXPONENT: u32 = 6;
const MAX_RETRY_AFTER_SECONDS: u64 = 60;

pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Backoff for retry `attempt` (1-based). A server-provided `Retry-After`
/// wins, clamped to a minute.
pub(crate) fn retry_delay(
    base_delay_ms: u64,
    attempt: usize,
    retry_after_seconds: Option<u64>,
) -> Duration {
    if let Some(retry_after_seconds) = retry_after_seconds {
        return Duration::from_secs(retry_after_seconds.min(MAX_RETRY_AFTER_SECONDS));
    }
    let exponent = (attempt.saturating_sub(1) as u32).min(MAX_BACKOFF_EXPONENT);
    Duration::from_millis(base_delay_ms.max(1).saturating_mul(2_u64.pow(exponent)))
}

pub(crate) fn is_retryable_slack_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

pub(crate) fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

/// Removes `<@BOT>` mentions so the assistant sees only the request text.
pub(crate) fn strip_bot_mention(text: &str, bot_user_id: &str) -> String {
    if bot_user_id.trim().is_empty() {
        return text.trim().to_string();
    }
    text.replace(&format!("<@{bot_user_id}>"), "")
        .trim()
        .to_string()
}

pub(crate) fn mentions_bot_user(text: &str, bot_user_id: &str) -> bool {
    let bot_user_id = bot_user_id.trim();
    !bot_user_id.is_empty() && text.contains(&format!("<@{bot_user_id}>"))
}
