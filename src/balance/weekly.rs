use serde::Serialize;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

use super::daily::compute_daily_totals;
use crate::activities::Activity;
use crate::calendar::{day_bounds, format_day, local_date, start_of_week, today};
use crate::plates::Plate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBalance {
    pub date: String,
    /// `None` for days that have not started yet.
    pub ingested: Option<f64>,
    pub resting: Option<f64>,
    pub activity_burned: Option<f64>,
    pub balance: Option<f64>,
    pub is_today: bool,
    pub is_future: bool,
    /// Before the account existed.
    pub is_past: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekSummary {
    pub start: String,
    pub end: String,
    pub days: Vec<DayBalance>,
    pub weekly_balance: i64,
    pub can_go_forward: bool,
    pub can_go_back: bool,
}

/// Seven Monday-first rows for the week containing `anchor`. Future days and days before
/// the account existed do not count towards `weekly_balance`.
pub fn aggregate_week(
    anchor: Date,
    meals: &[Plate],
    activities: &[Activity],
    bmr: i32,
    account_created_at: OffsetDateTime,
    now: OffsetDateTime,
    offset: UtcOffset,
) -> WeekSummary {
    let monday = start_of_week(anchor);
    let today = today(now, offset);
    let first_day = local_date(account_created_at, offset);

    let mut days = Vec::with_capacity(7);
    let mut sum = 0.0;
    for i in 0..7 {
        let day = monday + Duration::days(i);
        let is_future = day > today;
        let is_past = day < first_day;

        let row = if is_future {
            DayBalance {
                date: format_day(day),
                ingested: None,
                resting: None,
                activity_burned: None,
                balance: None,
                is_today: false,
                is_future,
                is_past,
            }
        } else if is_past {
            DayBalance {
                date: format_day(day),
                ingested: Some(0.0),
                resting: Some(0.0),
                activity_burned: Some(0.0),
                balance: Some(0.0),
                is_today: day == today,
                is_future,
                is_past,
            }
        } else {
            let day_meals: Vec<Plate> = meals
                .iter()
                .filter(|m| local_date(m.date, offset) == day)
                .cloned()
                .collect();
            let day_activities: Vec<Activity> = activities
                .iter()
                .filter(|a| local_date(a.date, offset) == day)
                .cloned()
                .collect();
            let totals = compute_daily_totals(day, &day_meals, &day_activities, bmr, now, offset);
            sum += totals.balance;
            DayBalance {
                date: format_day(day),
                ingested: Some(totals.ingested),
                resting: Some(totals.resting),
                activity_burned: Some(totals.activity_burned),
                balance: Some(totals.balance),
                is_today: day == today,
                is_future,
                is_past,
            }
        };
        days.push(row);
    }

    let sunday = monday + Duration::days(6);
    WeekSummary {
        start: format_day(monday),
        end: format_day(sunday),
        days,
        weekly_balance: sum.round() as i64,
        can_go_forward: can_go_forward(anchor, now, offset),
        can_go_back: can_go_back(anchor, account_created_at, offset),
    }
}

/// The next week is reachable only once the displayed week is fully over.
pub fn can_go_forward(anchor: Date, now: OffsetDateTime, offset: UtcOffset) -> bool {
    let sunday = start_of_week(anchor) + Duration::days(6);
    day_bounds(sunday, offset).end < day_bounds(today(now, offset), offset).end
}

/// The previous week is reachable while it ends after the account was created.
pub fn can_go_back(anchor: Date, account_created_at: OffsetDateTime, offset: UtcOffset) -> bool {
    let previous_sunday = start_of_week(anchor) - Duration::days(1);
    day_bounds(previous_sunday, offset).end >= account_created_at
}
