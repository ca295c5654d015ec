//! Quotation and settlement date arithmetic.
//!
//! Only weekends are skipped; there is no holiday calendar, so a quotation or
//! settlement date may land on a national holiday.

use crate::domain::QuotationConvention;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The first business day on or after `date`.
pub fn roll_forward(date: NaiveDate) -> NaiveDate {
    let mut d = date;
    while !is_business_day(d) {
        d += Duration::days(1);
    }
    d
}

/// Step `days` business days forward from `date`, landing on a business day.
///
/// With `days == 0` this is just [`roll_forward`].
pub fn add_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut d = roll_forward(date);
    for _ in 0..days {
        d = roll_forward(d + Duration::days(1));
    }
    d
}

/// Date on which a request's quota price is fixed.
///
/// Same-day convention quotes on the request date when the request time is at
/// or before the cutoff and on the next day otherwise; next-day convention
/// always advances one day. The result is rolled past weekends.
pub fn quotation_date(
    requested_at: NaiveDateTime,
    convention: QuotationConvention,
    cutoff: NaiveTime,
) -> NaiveDate {
    let request_day = requested_at.date();
    let day = match convention {
        QuotationConvention::SameDay if requested_at.time() <= cutoff => request_day,
        QuotationConvention::SameDay | QuotationConvention::NextDay => {
            request_day + Duration::days(1)
        }
    };
    roll_forward(day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    fn two_pm() -> NaiveTime {
        NaiveTime::from_hms_opt(14, 0, 0).unwrap()
    }

    // 2024-03-06 is a Wednesday.
    const WED: (i32, u32, u32) = (2024, 3, 6);

    #[test]
    fn test_same_day_before_cutoff_is_same_day() {
        let wed = ymd(WED.0, WED.1, WED.2);
        assert_eq!(wed.weekday(), Weekday::Wed);
        let q = quotation_date(at(wed, 13, 59), QuotationConvention::SameDay, two_pm());
        assert_eq!(q, wed);
    }

    #[test]
    fn test_same_day_at_cutoff_is_same_day() {
        let wed = ymd(WED.0, WED.1, WED.2);
        let q = quotation_date(at(wed, 14, 0), QuotationConvention::SameDay, two_pm());
        assert_eq!(q, wed);
    }

    #[test]
    fn test_same_day_after_cutoff_is_next_day() {
        let wed = ymd(WED.0, WED.1, WED.2);
        let q = quotation_date(at(wed, 14, 1), QuotationConvention::SameDay, two_pm());
        assert_eq!(q, ymd(2024, 3, 7));
    }

    #[test]
    fn test_friday_after_cutoff_rolls_to_monday() {
        let fri = ymd(2024, 3, 8);
        let q = quotation_date(at(fri, 16, 30), QuotationConvention::SameDay, two_pm());
        assert_eq!(q, ymd(2024, 3, 11));
        assert_eq!(q.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_next_day_always_advances() {
        let wed = ymd(WED.0, WED.1, WED.2);
        let q = quotation_date(at(wed, 9, 0), QuotationConvention::NextDay, two_pm());
        assert_eq!(q, ymd(2024, 3, 7));

        let fri = ymd(2024, 3, 8);
        let q = quotation_date(at(fri, 9, 0), QuotationConvention::NextDay, two_pm());
        assert_eq!(q, ymd(2024, 3, 11));
    }

    #[test]
    fn test_weekend_request_rolls_to_monday() {
        let sat = ymd(2024, 3, 9);
        let q = quotation_date(at(sat, 10, 0), QuotationConvention::SameDay, two_pm());
        assert_eq!(q, ymd(2024, 3, 11));
    }

    #[test]
    fn test_add_business_days_skips_weekends() {
        let wed = ymd(WED.0, WED.1, WED.2);
        assert_eq!(add_business_days(wed, 0), wed);
        assert_eq!(add_business_days(wed, 2), ymd(2024, 3, 8));
        assert_eq!(add_business_days(wed, 3), ymd(2024, 3, 11));
        let thu = ymd(2024, 3, 7);
        assert_eq!(add_business_days(thu, 3), ymd(2024, 3, 12));
    }

    #[test]
    fn test_add_business_days_from_weekend_starts_monday() {
        let sun = ymd(2024, 3, 10);
        assert_eq!(add_business_days(sun, 1), ymd(2024, 3, 12));
    }
}
