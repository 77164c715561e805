//! Date arithmetic shared by the loan and punishment lifecycles.
//!
//! Everything here is a pure function of its arguments; "now" is always
//! passed in explicitly.

use chrono::{DateTime, Datelike, Duration, Utc};

/// Month names in the desk's display locale (Turkish)
const MONTHS: [&str; 12] = [
    "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos", "Eylül", "Ekim",
    "Kasım", "Aralık",
];

pub fn add_days(date: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    date + Duration::days(days)
}

pub fn subtract_days(date: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    date - Duration::days(days)
}

/// Whole days from `start` to `end`, truncated toward zero.
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_days()
}

/// True if `date` lies strictly before `now`.
pub fn is_past(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    date < now
}

/// A loan is overdue when it is still out and its due date has passed.
pub fn is_overdue(
    ended_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    returned_at.is_none() && now > ended_at
}

/// `DD Month YYYY` with the Turkish month name, e.g. "05 Şubat 2024".
pub fn format_date(date: DateTime<Utc>) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

pub fn format_date_time(date: DateTime<Utc>) -> String {
    format!("{} {}", format_date(date), date.format("%H:%M"))
}

/// Human readable distance between `date` and `now`, e.g. "3 days ago" or
/// "in 2 hours". Thresholds follow the usual "time ago" rounding rules.
pub fn relative_time(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now - date;
    let in_future = delta < Duration::zero();
    let seconds = delta.num_seconds().abs();

    let minutes = (seconds as f64 / 60.0).round() as i64;
    let hours = (seconds as f64 / 3600.0).round() as i64;
    let days = (seconds as f64 / 86_400.0).round() as i64;

    let phrase = if seconds < 45 {
        "a few seconds".to_string()
    } else if seconds < 90 {
        "a minute".to_string()
    } else if minutes < 45 {
        format!("{} minutes", minutes)
    } else if minutes < 90 {
        "an hour".to_string()
    } else if hours < 22 {
        format!("{} hours", hours)
    } else if hours < 36 {
        "a day".to_string()
    } else if days < 26 {
        format!("{} days", days)
    } else if days < 46 {
        "a month".to_string()
    } else if days < 320 {
        format!("{} months", ((days as f64) / 30.4).round() as i64)
    } else if days < 548 {
        "a year".to_string()
    } else {
        format!("{} years", ((days as f64) / 365.0).round() as i64)
    };

    if in_future {
        format!("in {}", phrase)
    } else {
        format!("{} ago", phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_add_and_subtract_days() {
        assert_eq!(add_days(day(2024, 1, 1), 14), day(2024, 1, 15));
        assert_eq!(add_days(day(2024, 2, 20), 10), day(2024, 3, 1)); // leap year
        assert_eq!(subtract_days(day(2024, 1, 15), 14), day(2024, 1, 1));
    }

    #[test]
    fn test_days_between_truncates() {
        let start = day(2024, 1, 1);
        assert_eq!(days_between(start, day(2024, 1, 15)), 14);
        assert_eq!(days_between(start, start + Duration::hours(47)), 1);
        assert_eq!(days_between(day(2024, 1, 15), start), -14);
    }

    #[test]
    fn test_is_overdue_boundaries() {
        let due = day(2024, 1, 15);
        assert!(!is_overdue(due, None, day(2024, 1, 14)));
        // Exactly at the due instant is still on time
        assert!(!is_overdue(due, None, due));
        assert!(is_overdue(due, None, due + Duration::seconds(1)));
        assert!(is_overdue(due, None, day(2024, 1, 16)));
        // Returned loans are never overdue, however late it gets
        assert!(!is_overdue(due, Some(day(2024, 1, 20)), day(2030, 1, 1)));
    }

    #[test]
    fn test_is_past() {
        assert!(is_past(day(2024, 1, 1), day(2024, 1, 2)));
        assert!(!is_past(day(2024, 1, 2), day(2024, 1, 2)));
    }

    #[test]
    fn test_formatting() {
        let date = Utc.with_ymd_and_hms(2024, 2, 5, 14, 30, 0).unwrap();
        assert_eq!(format_date(date), "05 Şubat 2024");
        assert_eq!(format_date_time(date), "05 Şubat 2024 14:30");
        assert_eq!(format_date(day(2024, 12, 31)), "31 Aralık 2024");
    }

    #[test]
    fn test_relative_time() {
        let now = day(2024, 3, 1);
        assert_eq!(relative_time(now - Duration::seconds(10), now), "a few seconds ago");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(relative_time(now - Duration::days(1), now), "a day ago");
        assert_eq!(relative_time(now - Duration::days(3), now), "3 days ago");
        assert_eq!(relative_time(now + Duration::days(3), now), "in 3 days");
        assert_eq!(relative_time(now - Duration::days(400), now), "a year ago");
    }
}
