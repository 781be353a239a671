use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::instrument;

use super::daily::{compute_daily_totals, DailyTotals};
use super::weekly::{aggregate_week, WeekSummary};
use crate::{
    auth::Session,
    calendar::{day_bounds, format_day, parse_day, today, week_bounds},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance/daily", get(daily_balance))
        .route("/balance/weekly", get(weekly_balance))
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    pub anchor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyBalanceResponse {
    pub date: String,
    #[serde(flatten)]
    pub totals: DailyTotals,
    pub bmr: i32,
}

async fn bmr_of(state: &AppState, session: Session) -> AppResult<i32> {
    let user = state
        .users
        .find_by_id(session.user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(user.bmr)
}

#[instrument(skip(state))]
async fn daily_balance(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<DailyQuery>,
) -> AppResult<Json<DailyBalanceResponse>> {
    let now = OffsetDateTime::now_utc();
    let day = match q.date.as_deref() {
        Some(d) => parse_day(d)?,
        None => today(now, state.offset),
    };
    let bounds = day_bounds(day, state.offset);

    let (meals, activities, bmr) = tokio::try_join!(
        async { Ok::<_, AppError>(state.plates.list_between(session.user_id, bounds).await?) },
        async { Ok::<_, AppError>(state.activities.list_between(session.user_id, bounds).await?) },
        bmr_of(&state, session),
    )?;

    let totals = compute_daily_totals(day, &meals, &activities, bmr, now, state.offset);
    Ok(Json(DailyBalanceResponse {
        date: format_day(day),
        totals,
        bmr,
    }))
}

#[instrument(skip(state))]
async fn weekly_balance(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<WeeklyQuery>,
) -> AppResult<Json<WeekSummary>> {
    let now = OffsetDateTime::now_utc();
    let anchor = match q.anchor.as_deref() {
        Some(d) => parse_day(d)?,
        None => today(now, state.offset),
    };
    let bounds = week_bounds(anchor, state.offset);

    let (meals, activities, bmr) = tokio::try_join!(
        async { Ok::<_, AppError>(state.plates.list_between(session.user_id, bounds).await?) },
        async { Ok::<_, AppError>(state.activities.list_between(session.user_id, bounds).await?) },
        bmr_of(&state, session),
    )?;

    Ok(Json(aggregate_week(
        anchor,
        &meals,
        &activities,
        bmr,
        session.account_created_at,
        now,
        state.offset,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{MemoryUserRepository, UserRepository};
    use crate::calendar::noon;
    use crate::plates::model::{Ingredient, NewPlate, PlateContent};
    use crate::profile::{Profile, Sex};
    use std::sync::Arc;
    use time::macros::datetime;

    #[tokio::test]
    async fn daily_endpoint_combines_meals_activities_and_bmr() {
        let users = Arc::new(MemoryUserRepository::default());
        let state = AppState::fake_with_users(users.clone());
        let user = users.seed("ana@example.es", datetime!(2024-01-01 8:00 UTC)).unwrap();
        let profile = Profile::new(Some(Sex::Male), Some(30), Some(70.0), Some(175.0));
        users.update_profile(user.id, &profile).await.unwrap();
        let session = Session {
            user_id: user.id,
            account_created_at: user.created_at,
        };

        let day = parse_day("2024-03-12").unwrap();
        state
            .plates
            .insert(NewPlate {
                user_id: user.id,
                date: noon(day),
                content: PlateContent::new(
                    "Cocido",
                    vec![Ingredient {
                        name: "Garbanzos".into(),
                        weight: 300.0,
                        kcal: 900.0,
                        ..Default::default()
                    }],
                ),
                is_favorite: false,
                image: None,
            })
            .await
            .unwrap();

        let res = daily_balance(
            State(state.clone()),
            session,
            Query(DailyQuery {
                date: Some("2024-03-12".into()),
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(res.bmr, 1649);
        assert_eq!(res.totals.ingested, 900.0);
        assert_eq!(res.totals.resting, 1649.0);
        assert_eq!(res.totals.balance, -749.0);

        let week = weekly_balance(
            State(state),
            session,
            Query(WeeklyQuery {
                anchor: Some("2024-03-12".into()),
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(week.start, "2024-03-11");
        assert_eq!(week.days[1].ingested, Some(900.0));
        assert_eq!(week.weekly_balance, 900 - 7 * 1649);
    }
}
