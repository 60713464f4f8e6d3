//! Time-of-day formatting for email text.

use chrono::{NaiveTime, Timelike};

/// Formats a raw time string as `HHhMM`: `"19:00:00"` becomes `"19h00"`,
/// `"9:05"` becomes `"09h05"`. Blank input yields an empty string; anything
/// unparsable passes through unchanged.
pub fn format_hour(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    for pattern in ["%H:%M:%S", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, pattern) {
            return format!("{:02}h{:02}", time.hour(), time.minute());
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_time_formats_with_hour_separator() {
        assert_eq!(format_hour("19:00:00"), "19h00");
    }

    #[test]
    fn short_time_is_zero_padded() {
        assert_eq!(format_hour("9:05"), "09h05");
    }

    #[test]
    fn unparsable_input_passes_through() {
        assert_eq!(format_hour("a seguir ao almoço"), "a seguir ao almoço");
    }

    #[test]
    fn blank_input_yields_empty() {
        assert_eq!(format_hour("   "), "");
    }
}
