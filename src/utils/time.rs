
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};


/// Hours between check-in and the derived checkout instant.
pub const SHIFT_DURATION_HOURS: i64 = 7;

/// This is the standard way of converting a date to a string in shiftwatch. Storage keys for a
/// day are built from it.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a user-entered `HH:MM` clock time. Anything unparseable means "not checked in".
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

pub fn format_clock_time(value: NaiveTime) -> String {
    value.format("%H:%M").to_string()
}

/// Derives the checkout instant for a day: the check-in anchored to that day plus the shift
/// duration. Returns None for local times that don't exist (DST gaps).
pub fn checkout_instant(date: NaiveDate, in_time: NaiveTime) -> Option<DateTime<Local>> {
    let checked_in = Local
        .from_local_datetime(&date.and_time(in_time))
        .earliest()?;
    Some(checked_in + Duration::hours(SHIFT_DURATION_HOURS))
}

/// Fractional minutes from `from` until `to`. Negative once `to` is in the past.
pub fn minutes_until(from: DateTime<Local>, to: DateTime<Local>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    use super::*;

    #[test]
    fn parses_padded_and_unpadded_clock_times() {
        assert_eq!(
            parse_clock_time("09:30"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(parse_clock_time(" 9:05 "), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(parse_clock_time("24:00"), None);
        assert_eq!(parse_clock_time("soon"), None);
        assert_eq!(parse_clock_time(""), None);
    }

    #[test]
    fn checkout_is_shift_duration_after_check_in() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let in_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let checkout = checkout_instant(date, in_time).unwrap();
        assert_eq!(
            checkout,
            Local
                .from_local_datetime(&date.and_hms_opt(16, 0, 0).unwrap())
                .unwrap()
        );
    }

    #[test]
    fn minutes_until_is_fractional_and_signed() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let at = |h, m, s| {
            Local
                .from_local_datetime(&date.and_hms_opt(h, m, s).unwrap())
                .unwrap()
        };
        assert_eq!(minutes_until(at(9, 0, 0), at(10, 0, 0)), 60.0);
        assert_eq!(minutes_until(at(9, 0, 30), at(10, 0, 0)), 59.5);
        assert_eq!(minutes_until(at(10, 30, 0), at(10, 0, 0)), -30.0);
    }
}
