use time::{Date, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo::{Activity, NewActivity};
use crate::{
    auth::Session,
    calendar::{day_bounds, noon, validate_record_date},
    error::{AppError, AppResult},
    state::AppState,
};

/// Fields a user may change on a logged activity.
#[derive(Debug, Default, Clone)]
pub struct ActivityEdit {
    pub name: Option<String>,
    pub kcal: Option<f64>,
    pub date: Option<Date>,
}

fn validated_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("activity name is required".into()));
    }
    Ok(name.to_string())
}

fn validated_kcal(kcal: f64) -> AppResult<f64> {
    if !kcal.is_finite() || kcal <= 0.0 {
        return Err(AppError::Validation("kcal must be a positive number".into()));
    }
    Ok(kcal)
}

#[instrument(skip(st))]
pub async fn create(
    st: &AppState,
    session: Session,
    name: &str,
    kcal: f64,
    date: Date,
    now: OffsetDateTime,
) -> AppResult<Activity> {
    validate_record_date(date, session.account_created_at, now, st.offset)?;
    let activity = st
        .activities
        .insert(NewActivity {
            user_id: session.user_id,
            date: noon(date),
            name: validated_name(name)?,
            kcal: validated_kcal(kcal)?,
        })
        .await?;
    info!(activity_id = %activity.id, kcal = activity.kcal, "activity logged");
    Ok(activity)
}

/// Logs an activity described in free text; the analysis service estimates its kcal.
#[instrument(skip(st))]
pub async fn create_from_text(
    st: &AppState,
    session: Session,
    instructions: &str,
    date: Date,
    now: OffsetDateTime,
) -> AppResult<Activity> {
    validate_record_date(date, session.account_created_at, now, st.offset)?;
    if instructions.trim().is_empty() {
        return Err(AppError::Validation("describe the activity".into()));
    }

    let parsed = st.analysis.parse_activity_text(instructions.trim()).await?;
    let name = parsed.name.trim();
    if name.is_empty() {
        return Err(AppError::MalformedResponse("activity without a name".into()));
    }

    let activity = st
        .activities
        .insert(NewActivity {
            user_id: session.user_id,
            date: noon(date),
            name: name.to_string(),
            kcal: parsed.kcal.max(0.0),
        })
        .await?;
    info!(activity_id = %activity.id, kcal = activity.kcal, "activity logged from text");
    Ok(activity)
}

#[instrument(skip(st))]
pub async fn update(
    st: &AppState,
    session: Session,
    id: Uuid,
    edit: ActivityEdit,
    now: OffsetDateTime,
) -> AppResult<Activity> {
    let mut activity = get(st, session, id).await?;
    if let Some(name) = edit.name.as_deref() {
        activity.name = validated_name(name)?;
    }
    if let Some(kcal) = edit.kcal {
        activity.kcal = validated_kcal(kcal)?;
    }
    if let Some(date) = edit.date {
        validate_record_date(date, session.account_created_at, now, st.offset)?;
        activity.date = noon(date);
    }
    st.activities
        .update(&activity)
        .await?
        .ok_or(AppError::NotFound("activity"))
}

pub async fn get(st: &AppState, session: Session, id: Uuid) -> AppResult<Activity> {
    st.activities
        .get(session.user_id, id)
        .await?
        .ok_or(AppError::NotFound("activity"))
}

#[instrument(skip(st))]
pub async fn delete(st: &AppState, session: Session, id: Uuid) -> AppResult<()> {
    if !st.activities.delete(session.user_id, id).await? {
        return Err(AppError::NotFound("activity"));
    }
    Ok(())
}

pub async fn list_day(st: &AppState, session: Session, date: Date) -> AppResult<Vec<Activity>> {
    Ok(st
        .activities
        .list_between(session.user_id, day_bounds(date, st.offset))
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ActivityAnalysis, AnalysisClient};
    use crate::calendar::local_date;
    use crate::state::tests::{session_created, StubAnalysis};
    use std::sync::Arc;
    use time::macros::{date, datetime};

    const NOW: OffsetDateTime = datetime!(2024-06-05 10:00 UTC);

    #[tokio::test]
    async fn manual_activity_requires_name_and_positive_kcal() {
        let st = AppState::fake();
        let session = session_created(datetime!(2024-06-01 8:00 UTC));

        let err = create(&st, session, "  ", 200.0, date!(2024 - 06 - 05), NOW).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = create(&st, session, "Correr", 0.0, date!(2024 - 06 - 05), NOW).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let a = create(&st, session, " Correr ", 320.0, date!(2024 - 06 - 05), NOW).await.unwrap();
        assert_eq!(a.name, "Correr");
        assert_eq!(a.date, datetime!(2024-06-05 12:00 UTC));
        assert_eq!(local_date(a.date, st.offset), date!(2024 - 06 - 05));
        assert_eq!(list_day(&st, session, date!(2024 - 06 - 05)).await.unwrap().len(), 1);
        assert!(list_day(&st, session, date!(2024 - 06 - 04)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dates_outside_the_account_window_are_rejected() {
        let st = AppState::fake();
        let session = session_created(datetime!(2024-06-03 8:00 UTC));
        for day in [date!(2024 - 06 - 02), date!(2024 - 06 - 06)] {
            let err = create(&st, session, "Nadar", 250.0, day, NOW).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn text_activity_uses_the_analysis_result() {
        let stub = StubAnalysis {
            activity: Some(ActivityAnalysis {
                name: "Bici".into(),
                kcal: 410.0,
            }),
            ..Default::default()
        };
        let st = AppState::fake().with_analysis(Arc::new(stub) as Arc<dyn AnalysisClient>);
        let session = session_created(datetime!(2024-06-01 8:00 UTC));

        let a = create_from_text(&st, session, "45 min de bici", date!(2024 - 06 - 04), NOW)
            .await
            .unwrap();
        assert_eq!((a.name.as_str(), a.kcal), ("Bici", 410.0));
    }

    #[tokio::test]
    async fn update_and_delete_are_owner_scoped() {
        let st = AppState::fake();
        let owner = session_created(datetime!(2024-06-01 8:00 UTC));
        let other = session_created(datetime!(2024-06-01 8:00 UTC));
        let a = create(&st, owner, "Yoga", 150.0, date!(2024 - 06 - 05), NOW).await.unwrap();

        let edit = ActivityEdit {
            kcal: Some(180.0),
            date: Some(date!(2024 - 06 - 04)),
            ..Default::default()
        };
        assert!(matches!(
            update(&st, other, a.id, edit.clone(), NOW).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        let updated = update(&st, owner, a.id, edit, NOW).await.unwrap();
        assert_eq!(updated.kcal, 180.0);
        assert_eq!(updated.created_at, a.created_at);
        assert_eq!(local_date(updated.date, st.offset), date!(2024 - 06 - 04));

        assert!(matches!(delete(&st, other, a.id).await.unwrap_err(), AppError::NotFound(_)));
        delete(&st, owner, a.id).await.unwrap();
        assert!(matches!(get(&st, owner, a.id).await.unwrap_err(), AppError::NotFound(_)));
    }
}
