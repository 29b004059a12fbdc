use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Days, NaiveDate, Utc};

/// Return the current unix timestamp in seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// Return the current calendar date in UTC.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Return the calendar day before `date`, saturating at the minimum date.
pub fn day_before(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::day_before;

    #[test]
    fn day_before_crosses_month_and_year() {
        let jan_first = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            day_before(jan_first),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );

        let march_first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            day_before(march_first),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }
}
