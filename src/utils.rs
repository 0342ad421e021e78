/// Formats a timeline position as `MM:SS` for the transport display.
/// Negative and non-finite values render as `00:00`.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{:02}:{:02}", mins, secs)
}

/// Parses a numeric text field, returning `None` for blank or malformed input.
pub fn parse_f64_input(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Clamps a top-left coordinate so an extent of `size` stays inside `[0, bound]`.
/// When the extent is larger than the bound the coordinate pins to 0.
pub fn clamp_into(pos: f64, size: f64, bound: f64) -> f64 {
    pos.min(bound - size).max(0.0)
}
