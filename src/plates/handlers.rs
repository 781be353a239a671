use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{delete, get, post, put},
    Json, Router,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::dto::{
    DayQuery, FavoriteRequest, FavoritesQuery, FromFavoriteRequest, ImageQuery, IngredientInstructions,
    MealTextRequest, UpdatePlateRequest, VersionQuery, WeightRequest,
};
use super::model::Plate;
use super::services::{self, PlateEdit};
use crate::{
    auth::Session,
    calendar::parse_day,
    error::{AppError, AppResult},
    state::AppState,
};

const MAX_UPLOAD: usize = 20 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plates", get(list_plates))
        .route("/plates/favorites", get(list_favorites))
        .route("/plates/photo", post(create_from_photo))
        .route("/plates/text", post(create_from_text))
        .route("/plates/from-favorite", post(create_from_favorite))
        .route("/plates/:id", get(get_plate).put(update_plate).delete(delete_plate))
        .route("/plates/:id/image", get(redirect_to_image).put(replace_image))
        .route("/plates/:id/favorite", put(set_favorite))
        .route("/plates/:id/ingredients", post(add_ingredient))
        .route("/plates/:id/ingredients/:index", delete(remove_ingredient))
        .route("/plates/:id/ingredients/:index/weight", put(rescale_ingredient))
        .route("/plates/:id/ingredients/:index/edit", post(edit_ingredient))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD))
}

/// Photo upload: an `image` file field plus an optional `date` text field (defaults to today).
struct PhotoForm {
    image: Bytes,
    content_type: String,
    date: Option<String>,
}

async fn read_photo_form(mut mp: Multipart) -> AppResult<PhotoForm> {
    let mut image = None;
    let mut date = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("image") => {
                let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("unreadable image: {e}")))?;
                image = Some((data, content_type));
            }
            Some("date") => {
                date = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("unreadable date: {e}")))?,
                );
            }
            other => warn!(field = ?other, "ignoring unknown multipart field"),
        }
    }
    let (image, content_type) = image.ok_or_else(|| AppError::Validation("image is required".into()))?;
    Ok(PhotoForm {
        image,
        content_type,
        date,
    })
}

#[instrument(skip(state))]
async fn list_plates(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<DayQuery>,
) -> AppResult<Json<Vec<Plate>>> {
    let day = parse_day(&q.date)?;
    Ok(Json(services::list_day(&state, session, day).await?))
}

#[instrument(skip(state))]
async fn list_favorites(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<FavoritesQuery>,
) -> AppResult<Json<Vec<Plate>>> {
    Ok(Json(
        services::list_favorites(&state, session, q.search.as_deref()).await?,
    ))
}

#[instrument(skip(state))]
async fn get_plate(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Plate>> {
    Ok(Json(services::get(&state, session, id).await?))
}

/// 307 to a freshly presigned URL of the requested rendition.
#[instrument(skip(state))]
async fn redirect_to_image(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Query(q): Query<ImageQuery>,
) -> AppResult<Redirect> {
    let url = services::image_url(&state, session, id, q.size.into()).await?;
    Ok(Redirect::temporary(&url))
}

#[instrument(skip(state, mp))]
async fn create_from_photo(
    State(state): State<AppState>,
    session: Session,
    mp: Multipart,
) -> AppResult<(StatusCode, Json<Plate>)> {
    let form = read_photo_form(mp).await?;
    let now = OffsetDateTime::now_utc();
    let day = match form.date.as_deref() {
        Some(d) => parse_day(d)?,
        None => crate::calendar::today(now, state.offset),
    };
    let plate =
        services::create_from_photo(&state, session, form.image, &form.content_type, day, now).await?;
    Ok((StatusCode::CREATED, Json(plate)))
}

#[instrument(skip(state, body))]
async fn create_from_text(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<MealTextRequest>,
) -> AppResult<(StatusCode, Json<Plate>)> {
    let day = parse_day(&body.date)?;
    let plate =
        services::create_from_text(&state, session, &body.instructions, day, OffsetDateTime::now_utc())
            .await?;
    Ok((StatusCode::CREATED, Json(plate)))
}

#[instrument(skip(state))]
async fn create_from_favorite(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<FromFavoriteRequest>,
) -> AppResult<(StatusCode, Json<Plate>)> {
    let day = parse_day(&body.date)?;
    let plate =
        services::create_from_favorite(&state, session, body.favorite_id, day, OffsetDateTime::now_utc())
            .await?;
    Ok((StatusCode::CREATED, Json(plate)))
}

#[instrument(skip(state, body))]
async fn update_plate(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePlateRequest>,
) -> AppResult<Json<Plate>> {
    let edit = PlateEdit {
        description: body.description,
        date: body.date.as_deref().map(parse_day).transpose()?,
        components: body.components,
        is_favorite: body.is_favorite,
    };
    let plate = services::update(
        &state,
        session,
        id,
        edit,
        body.expected_version,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(plate))
}

#[instrument(skip(state))]
async fn delete_plate(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn set_favorite(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<FavoriteRequest>,
) -> AppResult<Json<Plate>> {
    Ok(Json(
        services::set_favorite(&state, session, id, body.is_favorite).await?,
    ))
}

#[instrument(skip(state))]
async fn rescale_ingredient(
    State(state): State<AppState>,
    session: Session,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(body): Json<WeightRequest>,
) -> AppResult<Json<Plate>> {
    let plate =
        services::rescale_ingredient(&state, session, id, index, body.weight, body.expected_version).await?;
    Ok(Json(plate))
}

#[instrument(skip(state))]
async fn remove_ingredient(
    State(state): State<AppState>,
    session: Session,
    Path((id, index)): Path<(Uuid, usize)>,
    Query(q): Query<VersionQuery>,
) -> AppResult<Json<Plate>> {
    let plate = services::remove_ingredient(&state, session, id, index, q.expected_version).await?;
    Ok(Json(plate))
}

#[instrument(skip(state, body))]
async fn add_ingredient(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(body): Json<IngredientInstructions>,
) -> AppResult<Json<Plate>> {
    let plate =
        services::add_ingredient(&state, session, id, &body.instructions, body.expected_version).await?;
    Ok(Json(plate))
}

#[instrument(skip(state, body))]
async fn edit_ingredient(
    State(state): State<AppState>,
    session: Session,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(body): Json<IngredientInstructions>,
) -> AppResult<Json<Plate>> {
    let plate = services::edit_ingredient(
        &state,
        session,
        id,
        index,
        &body.instructions,
        body.expected_version,
    )
    .await?;
    Ok(Json(plate))
}

#[instrument(skip(state, mp))]
async fn replace_image(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> AppResult<Json<Plate>> {
    let form = read_photo_form(mp).await?;
    let plate = services::replace_image(&state, session, id, form.image, OffsetDateTime::now_utc()).await?;
    Ok(Json(plate))
}
