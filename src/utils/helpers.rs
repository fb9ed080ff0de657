/// Helper utilities for formatting dashboard values

use chrono::{DateTime, Local, Utc};

/// Format a value already expressed in MiB (memory samples) to a readable size
pub fn format_mb(mb: f64) -> String {
    if mb >= 1024.0 {
        format!("{:.2} GB", mb / 1024.0)
    } else {
        format!("{:.2} MB", mb)
    }
}

/// Format a CPU sample (already scaled to percent)
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Format duration to human-readable string
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Format a container uptime in seconds; negative or NaN uptimes read as 0s
pub fn format_uptime(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return format_duration(0);
    }
    format_duration(seconds as u64)
}

/// Format a millisecond timestamp as local wall-clock time
pub fn format_clock(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(dt) => {
            let local: DateTime<Local> = dt.into();
            local.format("%H:%M:%S").to_string()
        }
        None => "--:--:--".to_string(),
    }
}

/// Format timestamp to human-readable string
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = (*dt).into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Truncate string with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Mask sensitive data (show only first and last N characters)
pub fn mask_sensitive(value: &str, visible_chars: usize) -> String {
    if value.len() <= visible_chars * 2 || !value.is_ascii() {
        "*".repeat(value.chars().count())
    } else {
        let start = &value[..visible_chars];
        let end = &value[value.len() - visible_chars..];
        format!("{}...{}", start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mb() {
        assert_eq!(format_mb(12.5), "12.50 MB");
        assert_eq!(format_mb(2048.0), "2.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3661), "1h 1m");
        assert_eq!(format_duration(86400), "1d 0h");
    }

    #[test]
    fn test_format_uptime_handles_bad_input() {
        assert_eq!(format_uptime(f64::NAN), "0s");
        assert_eq!(format_uptime(-4.0), "0s");
        assert_eq!(format_uptime(125.9), "2m 5s");
    }

    #[test]
    fn test_mask_sensitive() {
        let token = "5e7f294e4c92a9aa661fae8d347d832d";
        let masked = mask_sensitive(token, 4);
        assert_eq!(masked, "5e7f...832d");
        assert_eq!(mask_sensitive("abc", 4), "***");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("nginx:latest", 20), "nginx:latest");
        assert_eq!(truncate_string("registry.local/team/api:1.2.3", 12), "registry....");
    }
}
