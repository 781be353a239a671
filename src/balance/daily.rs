use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::activities::Activity;
use crate::calendar::{hours_elapsed, today};
use crate::plates::Plate;

/// kcal figures of one day. Positive `balance` is a surplus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyTotals {
    pub ingested: f64,
    pub resting: f64,
    pub activity_burned: f64,
    pub balance: f64,
}

/// BMR accrued on `date` as seen at `now`: the full amount for past days, nothing for
/// future days, and the share of elapsed hours for today.
pub fn resting_kcal(date: Date, bmr: i32, now: OffsetDateTime, offset: UtcOffset) -> f64 {
    if bmr <= 0 {
        return 0.0;
    }
    let bmr = bmr as f64;
    let today = today(now, offset);
    if date < today {
        bmr
    } else if date > today {
        0.0
    } else {
        (bmr / 24.0 * hours_elapsed(now, offset)).round()
    }
}

pub fn compute_daily_totals(
    date: Date,
    meals: &[Plate],
    activities: &[Activity],
    bmr: i32,
    now: OffsetDateTime,
    offset: UtcOffset,
) -> DailyTotals {
    let ingested: f64 = meals.iter().map(|m| m.content.totals().total_kcal).sum();
    let activity_burned: f64 = activities.iter().map(|a| a.kcal).sum();
    let resting = resting_kcal(date, bmr, now, offset);
    DailyTotals {
        ingested,
        resting,
        activity_burned,
        balance: ingested - resting - activity_burned,
    }
}
