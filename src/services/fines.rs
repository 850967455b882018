//! Due dates and overdue fines

use chrono::{DateTime, Duration, Utc};

/// Return deadline for a loan made at `loan_date`, in calendar days
pub fn due_date(loan_date: DateTime<Utc>, duration_days: i64) -> DateTime<Utc> {
    loan_date + Duration::days(duration_days)
}

/// Whole days elapsed past the deadline, never negative.
///
/// A partial day does not count: one second late is still 0.
pub fn fine_at(limit_return_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - limit_return_date).num_days().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap() + Duration::days(n)
    }

    #[test]
    fn test_due_date_is_fifteen_calendar_days_later() {
        assert_eq!(due_date(day(0), 15), day(15));
    }

    #[test]
    fn test_no_fine_until_deadline() {
        assert_eq!(fine_at(day(15), day(0)), 0);
        assert_eq!(fine_at(day(15), day(15)), 0);
        assert_eq!(fine_at(day(15), day(15) + Duration::hours(23)), 0);
    }

    #[test]
    fn test_fine_grows_one_per_full_day() {
        let limit = day(15);
        let mut previous = 0;
        for n in 16..=40 {
            let fine = fine_at(limit, day(n));
            assert_eq!(fine, previous + 1);
            previous = fine;
        }
    }

    #[test]
    fn test_returned_five_days_late() {
        assert_eq!(fine_at(due_date(day(0), 15), day(20)), 5);
    }
}
