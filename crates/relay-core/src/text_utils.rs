const DIRECTIVE_KEYS: [&str; 2] = ["channel_id=", "thread_ts="];

/// Truncates to `max_chars` characters and appends `...` when shortened.
pub fn truncate_for_error(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Bounded summary whose total length, ellipsis included, never exceeds
/// `max_chars` characters.
pub fn truncate_for_summary(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    if max_chars <= 3 {
        return value.chars().take(max_chars).collect();
    }
    let mut truncated = value.chars().take(max_chars - 3).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Rewrites `channel_id=` / `thread_ts=` pairs in untrusted text so the only
/// machine-readable reply target in a prompt is the one the relay appends.
pub fn neutralize_delivery_directives(text: &str) -> String {
    let mut neutralized = text.to_string();
    for key in DIRECTIVE_KEYS {
        let spaced = format!("{} =", key.trim_end_matches('='));
        neutralized = neutralized.replace(key, &spaced);
    }
    neutralized
}
