//! Pacing and retry timing
//!
//! Pure timing math for the dispatch loop: retry backoff, the randomized
//! inter-message delay, allowed-hours windows, and the daily-limit day
//! boundary. All window math is in UTC.

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::Rng;
use zaprust_storage::models::SendingConfiguration;

/// Backoff before retry attempt `retry_count` (1-based): 2^n minutes,
/// capped at 4 hours
pub fn backoff_delay(retry_count: i32) -> Duration {
    let minutes = std::cmp::min(2_i64.pow(retry_count.max(0) as u32), 240);
    Duration::minutes(minutes)
}

/// Random inter-message delay drawn uniformly from the campaign's
/// [min_delay, max_delay] range
pub fn inter_message_delay(config: &SendingConfiguration) -> std::time::Duration {
    let min = config.min_delay_seconds.max(0) as u64;
    let max = config.max_delay_seconds.max(0) as u64;

    let secs = if max <= min {
        min
    } else {
        rand::thread_rng().gen_range(min..=max)
    };

    std::time::Duration::from_secs(secs)
}

/// Whether `now` falls inside the campaign's allowed send window.
///
/// Windows wrap midnight when start > end (e.g. 22-6). A missing bound or
/// a degenerate start == end window means no restriction.
pub fn within_allowed_hours(config: &SendingConfiguration, now: DateTime<Utc>) -> bool {
    let (start, end) = match (config.allowed_hours_start, config.allowed_hours_end) {
        (Some(s), Some(e)) if s != e => (s, e),
        _ => return true,
    };

    let hour = now.hour() as i32;
    if start < end {
        hour >= start && hour < end
    } else {
        // Wrap-around window
        hour >= start || hour < end
    }
}

/// Next instant the allowed window opens at or after `now`.
///
/// Returns `now` unchanged when the window is already open.
pub fn next_window_start(config: &SendingConfiguration, now: DateTime<Utc>) -> DateTime<Utc> {
    if within_allowed_hours(config, now) {
        return now;
    }

    let start = match config.allowed_hours_start {
        Some(s) => s as u32,
        None => return now,
    };

    let today_start = now
        .with_hour(start)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);

    if today_start > now {
        today_start
    } else {
        today_start + Duration::days(1)
    }
}

/// Start of the current UTC day (daily limits reset at UTC midnight)
pub fn utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_hour(0)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

/// First instant of the next UTC day
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    utc_day_start(now) + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(
        min: i32,
        max: i32,
        hours: Option<(i32, i32)>,
    ) -> SendingConfiguration {
        let mut c = SendingConfiguration::defaults_for(uuid::Uuid::new_v4());
        c.min_delay_seconds = min;
        c.max_delay_seconds = max;
        if let Some((start, end)) = hours {
            c.allowed_hours_start = Some(start);
            c.allowed_hours_end = Some(end);
        }
        c
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, h, m, 0).unwrap()
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(1), Duration::minutes(2));
        assert_eq!(backoff_delay(2), Duration::minutes(4));
        assert_eq!(backoff_delay(3), Duration::minutes(8));
        assert_eq!(backoff_delay(10), Duration::minutes(240)); // Capped at 4 hours
    }

    #[test]
    fn test_inter_message_delay_range() {
        let c = config(5, 30, None);
        for _ in 0..100 {
            let d = inter_message_delay(&c).as_secs();
            assert!((5..=30).contains(&d));
        }
    }

    #[test]
    fn test_inter_message_delay_fixed() {
        let c = config(7, 7, None);
        assert_eq!(inter_message_delay(&c).as_secs(), 7);

        let zero = config(0, 0, None);
        assert_eq!(inter_message_delay(&zero).as_secs(), 0);
    }

    #[test]
    fn test_allowed_hours_unrestricted() {
        let c = config(0, 0, None);
        assert!(within_allowed_hours(&c, at(3, 0)));

        // Degenerate window counts as unrestricted
        let degenerate = config(0, 0, Some((9, 9)));
        assert!(within_allowed_hours(&degenerate, at(3, 0)));
    }

    #[test]
    fn test_allowed_hours_simple_window() {
        let c = config(0, 0, Some((9, 18)));
        assert!(!within_allowed_hours(&c, at(8, 59)));
        assert!(within_allowed_hours(&c, at(9, 0)));
        assert!(within_allowed_hours(&c, at(17, 59)));
        assert!(!within_allowed_hours(&c, at(18, 0)));
    }

    #[test]
    fn test_allowed_hours_wraparound_window() {
        let c = config(0, 0, Some((22, 6)));
        assert!(within_allowed_hours(&c, at(23, 0)));
        assert!(within_allowed_hours(&c, at(2, 0)));
        assert!(!within_allowed_hours(&c, at(12, 0)));
    }

    #[test]
    fn test_next_window_start() {
        let c = config(0, 0, Some((9, 18)));

        // Already open: unchanged
        let open = at(10, 0);
        assert_eq!(next_window_start(&c, open), open);

        // Before opening: today at 09:00
        assert_eq!(next_window_start(&c, at(7, 30)), at(9, 0));

        // After closing: tomorrow at 09:00
        let next = next_window_start(&c, at(20, 0));
        assert_eq!(next, at(9, 0) + Duration::days(1));
    }

    #[test]
    fn test_utc_day_boundaries() {
        let now = at(15, 42);
        assert_eq!(utc_day_start(now), at(0, 0));
        assert_eq!(next_utc_midnight(now), at(0, 0) + Duration::days(1));
    }
}
