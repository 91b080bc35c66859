use chrono::{DateTime, FixedOffset, Utc};

/// The service reports dates in China Standard Time.
const DISPLAY_OFFSET_SECS: i32 = 8 * 3600;

/// Current time, Unix epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Formats an epoch-millisecond expiry for display, e.g. `2024-03-01 08:00:00 (UTC+8)`.
pub fn format_expiry(timestamp_ms: i64) -> Option<String> {
    let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS)?;
    DateTime::from_timestamp_millis(timestamp_ms).map(|utc| {
        utc.with_timezone(&offset)
            .format("%Y-%m-%d %H:%M:%S (UTC+8)")
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_shown_in_utc_plus_eight() {
        assert_eq!(
            format_expiry(0).as_deref(),
            Some("1970-01-01 08:00:00 (UTC+8)")
        );
    }
}
