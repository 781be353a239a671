use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};

use super::{Profile, Sex};
use crate::{
    auth::Session,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(put_profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub sex: Option<Sex>,
    pub age: Option<i32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
}

#[instrument(skip(state))]
pub async fn get_profile(State(state): State<AppState>, session: Session) -> AppResult<Json<Profile>> {
    let user = state
        .users
        .find_by_id(session.user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    Ok(Json(user.profile()))
}

#[instrument(skip(state, body))]
pub async fn put_profile(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<Profile>> {
    if body.age.is_some_and(|a| !(0..=130).contains(&a)) {
        return Err(AppError::Validation("age out of range".into()));
    }
    for v in [body.weight_kg, body.height_cm].into_iter().flatten() {
        if !v.is_finite() || v < 0.0 {
            return Err(AppError::Validation("weight and height must be positive".into()));
        }
    }

    let profile = Profile::new(body.sex, body.age, body.weight_kg, body.height_cm);
    let user = state
        .users
        .update_profile(session.user_id, &profile)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    info!(user_id = %user.id, bmr = user.bmr, "profile updated");
    Ok(Json(user.profile()))
}
