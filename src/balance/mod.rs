//! Caloric balance: kcal ingested minus resting (BMR) and activity burn, per day and per week.

pub mod daily;
pub mod handlers;
pub mod weekly;

pub use daily::{compute_daily_totals, DailyTotals};
pub use handlers::router;
pub use weekly::{aggregate_week, DayBalance, WeekSummary};
