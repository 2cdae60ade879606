//! AppleScript sources used to drive Cursor.
//!
//! Every runtime value is embedded through [`applescript_string_literal`], which
//! is the only place transport escaping happens.

pub const CURSOR_APPLICATION_NAME: &str = "Cursor";
pub const FALLBACK_NOTIFICATION_TITLE: &str = "New Slack Message";

/// Pauses between UI steps, in seconds, before scaling.
const ACTIVATE_SETTLE_SECS: f64 = 0.5;
const NEW_AGENT_SESSION_SETTLE_SECS: f64 = 0.5;
const REFOCUS_BEFORE_PASTE_SECS: f64 = 0.3;
const PASTE_SETTLE_SECS: f64 = 0.5;
const REFOCUS_BEFORE_SEND_SECS: f64 = 0.2;
const SEND_SETTLE_SECS: f64 = 0.5;

/// Quotes `value` as an AppleScript string literal.
pub fn applescript_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\0' => {}
            _ => literal.push(ch),
        }
    }
    literal.push('"');
    literal
}

fn scaled_delay(seconds: f64, scale: f64) -> String {
    format!("{:.2}", (seconds * scale).max(0.0))
}

/// Clipboard + keystroke sequence: new Agent session (Cmd+Shift+I), paste
/// (Cmd+V), send (Return).
pub fn render_delivery_script(payload: &str, delay_scale: f64) -> String {
    let app = applescript_string_literal(CURSOR_APPLICATION_NAME);
    [
        format!("set the clipboard to {}", applescript_string_literal(payload)),
        format!("tell application {app}"),
        "  activate".to_string(),
        format!("  delay {}", scaled_delay(ACTIVATE_SETTLE_SECS, delay_scale)),
        "  tell application \"System Events\"".to_string(),
        "    key code 34 using {command down, shift down}".to_string(),
        format!(
            "    delay {}",
            scaled_delay(NEW_AGENT_SESSION_SETTLE_SECS, delay_scale)
        ),
        format!("    tell application {app} to activate"),
        format!(
            "    delay {}",
            scaled_delay(REFOCUS_BEFORE_PASTE_SECS, delay_scale)
        ),
        "    key code 9 using command down".to_string(),
        format!("    delay {}", scaled_delay(PASTE_SETTLE_SECS, delay_scale)),
        format!("    tell application {app} to activate"),
        format!(
            "    delay {}",
            scaled_delay(REFOCUS_BEFORE_SEND_SECS, delay_scale)
        ),
        "    key code 36".to_string(),
        format!("    delay {}", scaled_delay(SEND_SETTLE_SECS, delay_scale)),
        format!("    tell application {app} to activate"),
        "  end tell".to_string(),
        "end tell".to_string(),
    ]
    .join("\n")
}

pub fn render_fallback_notification_script(summary: &str) -> String {
    [
        format!(
            "tell application {} to activate",
            applescript_string_literal(CURSOR_APPLICATION_NAME)
        ),
        format!(
            "display notification {} with title {} sound name \"Glass\"",
            applescript_string_literal(summary),
            applescript_string_literal(FALLBACK_NOTIFICATION_TITLE)
        ),
    ]
    .join("\n")
}

pub fn render_activate_script(delay_scale: f64) -> String {
    [
        format!(
            "tell application {}",
            applescript_string_literal(CURSOR_APPLICATION_NAME)
        ),
        "  activate".to_string(),
        format!("  delay {}", scaled_delay(ACTIVATE_SETTLE_SECS, delay_scale)),
        "end tell".to_string(),
    ]
    .join("\n")
}

pub fn render_availability_script() -> String {
    format!(
        "tell application {} to return name",
        applescript_string_literal(CURSOR_APPLICATION_NAME)
    )
}
