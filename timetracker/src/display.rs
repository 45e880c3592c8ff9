//! Display formatting for derived timer values

use crate::config::TARGET_REACHED_MARKER;
use crate::services::settings::TimerMode;

/// Compact `H:MM` form used in the status text; `0:MM` below one hour
pub fn format_short(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{}:{:02}", hours, minutes)
}

/// `H:MM:SS`, or `M:SS` below one hour, used for the running session
pub fn format_long(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Status text for today's progress
pub fn status_text(mode: TimerMode, today_total: i64, daily_target: i64) -> String {
    match mode {
        TimerMode::TargetTime => {
            if today_total >= daily_target {
                let overtime = today_total - daily_target;
                if overtime == 0 {
                    TARGET_REACHED_MARKER.to_string()
                } else {
                    format!("+{}", format_short(overtime))
                }
            } else {
                format_short(daily_target - today_total)
            }
        }
        TimerMode::Stopwatch => format_short(today_total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_short() {
        assert_eq!(format_short(0), "0:00");
        assert_eq!(format_short(59), "0:00");
        assert_eq!(format_short(5 * 60), "0:05");
        assert_eq!(format_short(3600 + 7 * 60), "1:07");
        assert_eq!(format_short(12 * 3600), "12:00");
    }

    #[test]
    fn test_format_long() {
        assert_eq!(format_long(5), "0:05");
        assert_eq!(format_long(65), "1:05");
        assert_eq!(format_long(3600 + 61), "1:01:01");
    }

    #[test]
    fn test_status_text_target_mode() {
        assert_eq!(status_text(TimerMode::TargetTime, 0, 3 * 3600), "3:00");
        assert_eq!(status_text(TimerMode::TargetTime, 3600, 3 * 3600), "2:00");
        assert_eq!(
            status_text(TimerMode::TargetTime, 3 * 3600, 3 * 3600),
            TARGET_REACHED_MARKER
        );
        assert_eq!(
            status_text(TimerMode::TargetTime, 3 * 3600 + 15 * 60, 3 * 3600),
            "+0:15"
        );
    }

    #[test]
    fn test_status_text_stopwatch_mode() {
        assert_eq!(status_text(TimerMode::Stopwatch, 0, 3 * 3600), "0:00");
        assert_eq!(status_text(TimerMode::Stopwatch, 4 * 3600, 3 * 3600), "4:00");
    }
}
