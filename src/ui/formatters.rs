/// Format seconds as `H:MM:SS.mmm`, or `M:SS.mmm` under an hour
pub fn format_duration(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let (hours, rest) = (millis / 3_600_000, millis % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (secs, ms) = (rest / 1000, rest % 1000);

    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
    } else {
        format!("{}:{:02}.{:03}", minutes, secs, ms)
    }
}

/// Percentage saved going from `before` to `after` bytes
pub fn format_savings(before: u64, after: u64) -> String {
    if before == 0 {
        return "-".to_string();
    }
    let ratio = 1.0 - after as f64 / before as f64;
    format!("{:.1}%", ratio * 100.0)
}
