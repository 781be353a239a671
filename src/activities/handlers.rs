use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::repo::Activity;
use super::services::{self, ActivityEdit};
use crate::{
    auth::Session,
    calendar::parse_day,
    error::AppResult,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/activities", get(list_activities).post(create_activity))
        .route("/activities/text", post(create_activity_from_text))
        .route("/activities/:id", put(update_activity).delete(delete_activity))
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateActivityRequest {
    pub name: String,
    pub kcal: f64,
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivityTextRequest {
    pub instructions: String,
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateActivityRequest {
    pub name: Option<String>,
    pub kcal: Option<f64>,
    pub date: Option<String>,
}

#[instrument(skip(state))]
async fn list_activities(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<DayQuery>,
) -> AppResult<Json<Vec<Activity>>> {
    let day = parse_day(&q.date)?;
    Ok(Json(services::list_day(&state, session, day).await?))
}

#[instrument(skip(state, body))]
async fn create_activity(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateActivityRequest>,
) -> AppResult<(StatusCode, Json<Activity>)> {
    let day = parse_day(&body.date)?;
    let activity = services::create(
        &state,
        session,
        &body.name,
        body.kcal,
        day,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

#[instrument(skip(state, body))]
async fn create_activity_from_text(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<ActivityTextRequest>,
) -> AppResult<(StatusCode, Json<Activity>)> {
    let day = parse_day(&body.date)?;
    let activity =
        services::create_from_text(&state, session, &body.instructions, day, OffsetDateTime::now_utc())
            .await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

#[instrument(skip(state, body))]
async fn update_activity(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateActivityRequest>,
) -> AppResult<Json<Activity>> {
    let edit = ActivityEdit {
        name: body.name,
        kcal: body.kcal,
        date: body.date.as_deref().map(parse_day).transpose()?,
    };
    let activity = services::update(&state, session, id, edit, OffsetDateTime::now_utc()).await?;
    Ok(Json(activity))
}

#[instrument(skip(state))]
async fn delete_activity(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
