/// Format a metric value with its unit for display.
///
/// Percentages keep two decimals, millisecond and kbps values are rounded
/// to whole numbers, anything else keeps two decimals.
pub fn format_value(value: f64, unit: &str) -> String {
    match unit {
        "%" => format!("{:.2}%", value),
        "ms" | "kbps" => format!("{:.0}{}", value.round(), unit),
        _ => format!("{:.2}{}", value, unit),
    }
}

/// Format a signed percentage change, e.g. "+10.0%" / "-3.5%".
pub fn format_change(direction_up: bool, magnitude: f64) -> String {
    let sign = if direction_up { '+' } else { '-' };
    format!("{}{:.1}%", sign, magnitude)
}

/// Format a Unix timestamp in milliseconds as a UTC wall-clock time, e.g. "12:00:00 UTC".
pub fn format_clock(epoch_ms: u64) -> String {
    let secs = (epoch_ms / 1000) % 86_400;
    format!(
        "{:02}:{:02}:{:02} UTC",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
