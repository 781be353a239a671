//! Calendar helpers. Every "which day is it" decision goes through a single
//! reference offset so that day bounds, "today" and pro-ration agree.

use time::{
    macros::{format_description, time},
    Date, Duration, OffsetDateTime, UtcOffset,
};

use crate::error::AppError;

/// Inclusive instant range covering one calendar day in the reference offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl DayBounds {
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        instant >= self.start && instant <= self.end
    }
}

pub fn day_bounds(date: Date, offset: UtcOffset) -> DayBounds {
    DayBounds {
        start: date.midnight().assume_offset(offset),
        end: date.with_time(time!(23:59:59.999)).assume_offset(offset),
    }
}

/// Bounds from the Monday of `date`'s week to the end of that week's Sunday.
pub fn week_bounds(date: Date, offset: UtcOffset) -> DayBounds {
    let monday = start_of_week(date);
    DayBounds {
        start: day_bounds(monday, offset).start,
        end: day_bounds(monday + Duration::days(6), offset).end,
    }
}

pub fn start_of_week(date: Date) -> Date {
    date - Duration::days(date.weekday().number_days_from_monday() as i64)
}

pub fn local_date(instant: OffsetDateTime, offset: UtcOffset) -> Date {
    instant.to_offset(offset).date()
}

pub fn today(now: OffsetDateTime, offset: UtcOffset) -> Date {
    local_date(now, offset)
}

/// Hours elapsed since local midnight, minute resolution (`h + m / 60`).
pub fn hours_elapsed(now: OffsetDateTime, offset: UtcOffset) -> f64 {
    let local = now.to_offset(offset);
    local.hour() as f64 + local.minute() as f64 / 60.0
}

/// Timestamp stored for a record attributed to `date`: noon UTC of that day,
/// which stays inside the same calendar day for any offset within ±11h.
pub fn noon(date: Date) -> OffsetDateTime {
    date.with_time(time!(12:00)).assume_utc()
}

pub fn parse_day(value: &str) -> Result<Date, AppError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::Validation(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

pub fn format_day(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// A record may only be attributed to a day in `[account creation day, today]`.
pub fn validate_record_date(
    date: Date,
    account_created_at: OffsetDateTime,
    now: OffsetDateTime,
    offset: UtcOffset,
) -> Result<(), AppError> {
    if date < local_date(account_created_at, offset) {
        return Err(AppError::Validation(
            "The date cannot be earlier than your account creation".into(),
        ));
    }
    if date > today(now, offset) {
        return Err(AppError::Validation("The date cannot be later than today".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    #[test]
    fn day_bounds_follow_reference_offset() {
        let b = day_bounds(date!(2024 - 03 - 10), offset!(+2));
        assert_eq!(b.start, datetime!(2024-03-09 22:00 UTC));
        assert!(b.contains(noon(date!(2024 - 03 - 10))));
        assert!(!b.contains(noon(date!(2024 - 03 - 11))));
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-03-10 is a Sunday
        assert_eq!(start_of_week(date!(2024 - 03 - 10)), date!(2024 - 03 - 04));
        assert_eq!(start_of_week(date!(2024 - 03 - 04)), date!(2024 - 03 - 04));
        let w = week_bounds(date!(2024 - 03 - 06), offset!(UTC));
        assert_eq!(w.start, datetime!(2024-03-04 0:00 UTC));
        assert_eq!(w.end.date(), date!(2024 - 03 - 10));
    }

    #[test]
    fn hours_elapsed_uses_minutes() {
        let now = datetime!(2024-05-01 16:30 UTC);
        assert_eq!(hours_elapsed(now, offset!(+2)), 18.5);
    }

    #[test]
    fn today_crosses_midnight_in_reference_offset() {
        let now = datetime!(2024-05-01 23:30 UTC);
        assert_eq!(today(now, offset!(+2)), date!(2024 - 05 - 02));
    }

    #[test]
    fn parse_day_rejects_garbage() {
        assert_eq!(parse_day("2024-02-29").unwrap(), date!(2024 - 02 - 29));
        assert!(matches!(parse_day("29/02/2024"), Err(AppError::Validation(_))));
    }

    #[test]
    fn record_date_window() {
        let created = datetime!(2024-01-10 09:00 UTC);
        let now = datetime!(2024-01-20 10:00 UTC);
        let off = offset!(+2);
        assert!(validate_record_date(date!(2024 - 01 - 10), created, now, off).is_ok());
        assert!(validate_record_date(date!(2024 - 01 - 20), created, now, off).is_ok());
        assert!(validate_record_date(date!(2024 - 01 - 09), created, now, off).is_err());
        assert!(validate_record_date(date!(2024 - 01 - 21), created, now, off).is_err());
    }
}
