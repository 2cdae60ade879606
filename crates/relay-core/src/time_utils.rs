use chrono::DateTime;

/// Renders a Slack message timestamp (`"1700000000.123456"`) as a UTC wall
/// clock label. Unparsable input is returned verbatim.
pub fn format_slack_timestamp(ts: &str) -> String {
    let trimmed = ts.trim();
    let (seconds_raw, fraction_raw) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let Ok(seconds) = seconds_raw.parse::<i64>() else {
        return ts.to_string();
    };
    let nanos = parse_fraction_nanos(fraction_raw).unwrap_or(0);
    match DateTime::from_timestamp(seconds, nanos) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => ts.to_string(),
    }
}

fn parse_fraction_nanos(fraction: &str) -> Option<u32> {
    if fraction.is_empty() || !fraction.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{fraction:0<9}");
    padded.get(..9)?.parse::<u32>().ok()
}
