use bytes::Bytes;
use time::{Date, OffsetDateTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::dedup::{find_duplicate, from_favorite, template_from};
use super::model::{Ingredient, NewPlate, Plate, PlateContent, PlateImage};
use super::repo::UpdateOutcome;
use crate::{
    analysis::IngredientEditRequest,
    auth::Session,
    calendar::{day_bounds, noon, validate_record_date},
    error::{AppError, AppResult},
    images::{
        image_hash, presign_rendition, store_versions,
        versioner::{new_image_id, object_key, Rendition},
        StoredImage,
    },
    state::AppState,
};

/// Fields a user may change directly. `None` keeps the stored value.
#[derive(Debug, Default, Clone)]
pub struct PlateEdit {
    pub description: Option<String>,
    pub date: Option<Date>,
    pub components: Option<Vec<Ingredient>>,
    pub is_favorite: Option<bool>,
}

fn check_date(st: &AppState, session: Session, date: Date, now: OffsetDateTime) -> AppResult<()> {
    validate_record_date(date, session.account_created_at, now, st.offset)
}

fn check_photo(photo: &Bytes) -> AppResult<()> {
    if photo.is_empty() {
        return Err(AppError::Validation("empty image".into()));
    }
    Ok(())
}

async fn upload(st: &AppState, user_id: Uuid, photo: Bytes, now: OffsetDateTime) -> AppResult<StoredImage> {
    let image_id = new_image_id(now);
    store_versions(
        st.storage.as_ref(),
        st.config.storage.url_ttl_secs,
        user_id,
        &image_id,
        photo,
    )
    .await
}

/// Removes the renditions of an image that never made it into a stored plate.
async fn discard(st: &AppState, user_id: Uuid, image_id: &str) {
    for rendition in [Rendition::Large, Rendition::Thumb] {
        let key = object_key(user_id, image_id, rendition);
        if let Err(e) = st.storage.delete_object(&key).await {
            warn!(error = %e, key = %key, "could not remove unused rendition");
        }
    }
}

fn attach(stored: StoredImage, hash: String) -> PlateImage {
    PlateImage {
        image_id: stored.image_id,
        image_url: stored.image_url,
        thumbnail_url: Some(stored.thumbnail_url),
        image_hash: Some(hash),
    }
}

/// Logs a meal from a photo. A photo already logged the same day is copied instead of
/// analysed again; otherwise it is analysed first and only then versioned and uploaded.
#[instrument(skip(st, photo), fields(size = photo.len()))]
pub async fn create_from_photo(
    st: &AppState,
    session: Session,
    photo: Bytes,
    content_type: &str,
    date: Date,
    now: OffsetDateTime,
) -> AppResult<Plate> {
    check_date(st, session, date, now)?;
    check_photo(&photo)?;

    let day = noon(date);
    let hash = image_hash(&photo);

    if let Some(original) = find_duplicate(st.plates.as_ref(), session.user_id, day, st.offset, &hash).await? {
        let copy = st.plates.insert(template_from(&original, day)).await?;
        info!(plate_id = %copy.id, original = %original.id, "plate copied from duplicate image");
        return Ok(copy);
    }

    let analysis = st.analysis.analyze_photo(photo.clone(), content_type).await?;
    let content = PlateContent::from_analysis(analysis.description, analysis.components);
    debug!(components = content.components().len(), "photo analysed");

    let stored = upload(st, session.user_id, photo, now).await?;
    let image_id = stored.image_id.clone();
    let new_plate = NewPlate {
        user_id: session.user_id,
        date: day,
        content,
        is_favorite: false,
        image: Some(attach(stored, hash)),
    };

    match st.plates.insert(new_plate).await {
        Ok(plate) => {
            info!(plate_id = %plate.id, kcal = plate.content.totals().total_kcal, "plate logged from photo");
            Ok(plate)
        }
        Err(e) => {
            discard(st, session.user_id, &image_id).await;
            Err(e.into())
        }
    }
}

/// Logs a meal described in free text. No image is attached.
#[instrument(skip(st))]
pub async fn create_from_text(
    st: &AppState,
    session: Session,
    instructions: &str,
    date: Date,
    now: OffsetDateTime,
) -> AppResult<Plate> {
    check_date(st, session, date, now)?;
    let instructions = instructions.trim();
    if instructions.is_empty() {
        return Err(AppError::Validation("describe the meal".into()));
    }

    let analysis = st.analysis.parse_meal_text(instructions).await?;
    let plate = st
        .plates
        .insert(NewPlate {
            user_id: session.user_id,
            date: noon(date),
            content: PlateContent::from_analysis(analysis.description, analysis.components),
            is_favorite: false,
            image: None,
        })
        .await?;
    info!(plate_id = %plate.id, "plate logged from text");
    Ok(plate)
}

/// Places a copy of a favorite plate on `date`. No analysis call is made.
#[instrument(skip(st))]
pub async fn create_from_favorite(
    st: &AppState,
    session: Session,
    favorite_id: Uuid,
    date: Date,
    now: OffsetDateTime,
) -> AppResult<Plate> {
    check_date(st, session, date, now)?;
    let favorite = get(st, session, favorite_id).await?;
    if !favorite.is_favorite {
        return Err(AppError::Validation("plate is not a favorite".into()));
    }
    let plate = st.plates.insert(from_favorite(&favorite, date)).await?;
    info!(plate_id = %plate.id, favorite = %favorite.id, "plate copied from favorite");
    Ok(plate)
}

pub async fn get(st: &AppState, session: Session, id: Uuid) -> AppResult<Plate> {
    st.plates
        .get(session.user_id, id)
        .await?
        .ok_or(AppError::NotFound("plate"))
}

pub async fn list_day(st: &AppState, session: Session, date: Date) -> AppResult<Vec<Plate>> {
    Ok(st
        .plates
        .list_between(session.user_id, day_bounds(date, st.offset))
        .await?)
}

/// Favorites sorted by description, optionally filtered by a case-insensitive substring.
pub async fn list_favorites(st: &AppState, session: Session, search: Option<&str>) -> AppResult<Vec<Plate>> {
    let mut favorites = st.plates.list_favorites(session.user_id).await?;
    if let Some(needle) = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()) {
        favorites.retain(|p| p.content.description.to_lowercase().contains(&needle));
    }
    favorites.sort_by_key(|p| p.content.description.to_lowercase());
    Ok(favorites)
}

async fn persist(st: &AppState, plate: &Plate, expected_version: Option<i32>) -> AppResult<Plate> {
    match st.plates.update(plate, expected_version).await? {
        UpdateOutcome::Updated(p) => Ok(p),
        UpdateOutcome::NotFound => Err(AppError::NotFound("plate")),
        UpdateOutcome::Stale => {
            warn!(plate_id = %plate.id, ?expected_version, "stale plate update rejected");
            Err(AppError::Conflict("plate"))
        }
    }
}

/// Loads a plate for a read-modify-write. A caller supplied version must match the
/// stored one.
async fn load_for_edit(
    st: &AppState,
    session: Session,
    id: Uuid,
    expected_version: Option<i32>,
) -> AppResult<Plate> {
    let plate = get(st, session, id).await?;
    if expected_version.is_some_and(|v| v != plate.version) {
        return Err(AppError::Conflict("plate"));
    }
    Ok(plate)
}

#[instrument(skip(st, edit))]
pub async fn update(
    st: &AppState,
    session: Session,
    id: Uuid,
    edit: PlateEdit,
    expected_version: Option<i32>,
    now: OffsetDateTime,
) -> AppResult<Plate> {
    let mut plate = load_for_edit(st, session, id, expected_version).await?;

    if let Some(date) = edit.date {
        check_date(st, session, date, now)?;
        plate.date = noon(date);
    }
    if let Some(description) = edit.description {
        plate.content.description = description.trim().to_string();
    }
    if let Some(components) = edit.components {
        plate.content.set_components(components);
    }
    if let Some(flag) = edit.is_favorite {
        plate.is_favorite = flag;
    }

    persist(st, &plate, expected_version).await
}

#[instrument(skip(st))]
pub async fn set_favorite(st: &AppState, session: Session, id: Uuid, is_favorite: bool) -> AppResult<Plate> {
    st.plates
        .set_favorite(session.user_id, id, is_favorite)
        .await?
        .ok_or(AppError::NotFound("plate"))
}

/// Deletes the record only. Its renditions may be shared with copies made by
/// duplicate detection, so blobs stay in the store.
#[instrument(skip(st))]
pub async fn delete(st: &AppState, session: Session, id: Uuid) -> AppResult<()> {
    if !st.plates.delete(session.user_id, id).await? {
        return Err(AppError::NotFound("plate"));
    }
    info!(plate_id = %id, "plate deleted");
    Ok(())
}

/// Sets an ingredient's weight (> 0) and rescales its kcal and macros from the values it
/// had before its first weight change.
#[instrument(skip(st))]
pub async fn rescale_ingredient(
    st: &AppState,
    session: Session,
    id: Uuid,
    index: usize,
    weight: f64,
    expected_version: Option<i32>,
) -> AppResult<Plate> {
    let mut plate = load_for_edit(st, session, id, expected_version).await?;
    plate.content.rescale_ingredient(index, weight)?;
    persist(st, &plate, Some(plate.version)).await
}

#[instrument(skip(st))]
pub async fn remove_ingredient(
    st: &AppState,
    session: Session,
    id: Uuid,
    index: usize,
    expected_version: Option<i32>,
) -> AppResult<Plate> {
    let mut plate = load_for_edit(st, session, id, expected_version).await?;
    plate.content.remove_ingredient(index)?;
    persist(st, &plate, Some(plate.version)).await
}

/// Asks the analysis service for a new ingredient described by `instructions` and appends it.
#[instrument(skip(st))]
pub async fn add_ingredient(
    st: &AppState,
    session: Session,
    id: Uuid,
    instructions: &str,
    expected_version: Option<i32>,
) -> AppResult<Plate> {
    let instructions = instructions.trim();
    if instructions.is_empty() {
        return Err(AppError::Validation("describe the ingredient".into()));
    }
    let mut plate = load_for_edit(st, session, id, expected_version).await?;

    let ingredient = st.analysis.add_ingredient(instructions).await?;
    if ingredient.name.trim().is_empty() {
        return Err(AppError::MalformedResponse("ingredient without a name".into()));
    }
    if !plate.content.push_ingredient(ingredient) {
        debug!(plate_id = %plate.id, "repeated ingredient ignored");
        return Ok(plate);
    }
    persist(st, &plate, Some(plate.version)).await
}

/// Lets the analysis service rewrite one ingredient. Returned fields that are missing
/// or zero keep their previous values.
#[instrument(skip(st))]
pub async fn edit_ingredient(
    st: &AppState,
    session: Session,
    id: Uuid,
    index: usize,
    instructions: &str,
    expected_version: Option<i32>,
) -> AppResult<Plate> {
    let instructions = instructions.trim();
    if instructions.is_empty() {
        return Err(AppError::Validation("describe the change".into()));
    }
    let mut plate = load_for_edit(st, session, id, expected_version).await?;
    let name = plate
        .content
        .components()
        .get(index)
        .map(|c| c.name.clone())
        .ok_or_else(|| AppError::Validation(format!("ingredient {index} does not exist")))?;

    let request = IngredientEditRequest {
        plate: plate.content.clone(),
        instructions: instructions.to_string(),
        index,
        name,
    };
    let patch = st.analysis.edit_ingredient(&request).await?;
    plate.content.patch_ingredient(index, &patch)?;
    persist(st, &plate, Some(plate.version)).await
}

/// Attaches a new photo to an existing plate. Nutritional content is left untouched.
#[instrument(skip(st, photo), fields(size = photo.len()))]
pub async fn replace_image(
    st: &AppState,
    session: Session,
    id: Uuid,
    photo: Bytes,
    now: OffsetDateTime,
) -> AppResult<Plate> {
    check_photo(&photo)?;
    let mut plate = get(st, session, id).await?;
    let hash = image_hash(&photo);

    let stored = upload(st, session.user_id, photo, now).await?;
    let image_id = stored.image_id.clone();
    plate.image = Some(attach(stored, hash));

    match persist(st, &plate, Some(plate.version)).await {
        Ok(p) => Ok(p),
        Err(e) => {
            discard(st, session.user_id, &image_id).await;
            Err(e)
        }
    }
}

/// Fresh presigned URL for one rendition of a plate's image.
pub async fn image_url(st: &AppState, session: Session, id: Uuid, rendition: Rendition) -> AppResult<String> {
    let plate = get(st, session, id).await?;
    let image = plate.image.ok_or(AppError::NotFound("image"))?;
    Ok(presign_rendition(st, session.user_id, &image.image_id, rendition).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisClient, IngredientPatch, PlateAnalysis};
    use crate::images::versioner::tests::sample_png;
    use crate::state::tests::{session_created, StubAnalysis};
    use crate::storage::MemoryStorage;
    use std::sync::Arc;
    use time::macros::{date, datetime};

    const NOW: OffsetDateTime = datetime!(2024-06-05 10:00 UTC);
    const TODAY: Date = date!(2024 - 06 - 05);

    fn ing(name: &str, weight: f64, kcal: f64) -> Ingredient {
        Ingredient {
            name: name.into(),
            weight,
            kcal,
            protein_weight: 10.0,
            carbohydrates_weight: 20.0,
            fats_weight: 5.0,
            baseline: None,
        }
    }

    fn lunch() -> PlateAnalysis {
        PlateAnalysis {
            description: "Pollo con arroz".into(),
            components: vec![ing("Pollo", 150.0, 250.0), ing("Arroz", 100.0, 130.0), ing("", 10.0, 5.0)],
        }
    }

    struct Fixture {
        st: AppState,
        stub: Arc<StubAnalysis>,
        storage: Arc<MemoryStorage>,
        session: Session,
    }

    fn fixture(stub: StubAnalysis) -> Fixture {
        fixture_with_storage(stub, MemoryStorage::default())
    }

    fn fixture_with_storage(stub: StubAnalysis, storage: MemoryStorage) -> Fixture {
        let stub = Arc::new(stub);
        let storage = Arc::new(storage);
        let st = AppState::fake()
            .with_analysis(stub.clone() as Arc<dyn AnalysisClient>)
            .with_storage(storage.clone());
        Fixture {
            st,
            stub,
            storage,
            session: session_created(datetime!(2024-06-01 8:00 UTC)),
        }
    }

    #[tokio::test]
    async fn photo_plate_is_analysed_versioned_and_stored() {
        let f = fixture(StubAnalysis {
            photo: Some(lunch()),
            ..Default::default()
        });
        let photo = Bytes::from(sample_png(320, 240));

        let plate = create_from_photo(&f.st, f.session, photo.clone(), "image/png", TODAY, NOW)
            .await
            .unwrap();

        assert_eq!(plate.content.components().len(), 2);
        assert_eq!(plate.content.totals().total_kcal, 380.0);
        assert_eq!(plate.date, datetime!(2024-06-05 12:00 UTC));
        let image = plate.image.expect("image attached");
        assert_eq!(image.image_hash.as_deref(), Some(image_hash(&photo).as_str()));
        assert_eq!(image.image_id, "1717581600000");
        assert_eq!(f.storage.keys().len(), 2);
        assert_eq!(f.stub.photo_calls(), 1);
    }

    #[tokio::test]
    async fn same_photo_same_day_is_copied_without_analysis() {
        let f = fixture(StubAnalysis {
            photo: Some(lunch()),
            ..Default::default()
        });
        let photo = Bytes::from(sample_png(64, 64));

        let first = create_from_photo(&f.st, f.session, photo.clone(), "image/png", TODAY, NOW)
            .await
            .unwrap();
        let second = create_from_photo(&f.st, f.session, photo, "image/png", TODAY, NOW)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.content.description, "Copia de Pollo con arroz");
        assert_eq!(second.content.components(), first.content.components());
        assert_eq!(second.image, first.image);
        assert_eq!(f.stub.photo_calls(), 1);
        assert_eq!(f.storage.keys().len(), 2);
    }

    #[tokio::test]
    async fn failed_analysis_leaves_no_blobs() {
        let f = fixture(StubAnalysis::default());
        let err = create_from_photo(
            &f.st,
            f.session,
            Bytes::from(sample_png(64, 64)),
            "image/png",
            TODAY,
            NOW,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
        assert!(f.storage.keys().is_empty());
        assert!(list_day(&f.st, f.session, TODAY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_aborts_the_save() {
        let f = fixture_with_storage(
            StubAnalysis {
                photo: Some(lunch()),
                ..Default::default()
            },
            MemoryStorage::failing_on("_large"),
        );
        let err = create_from_photo(
            &f.st,
            f.session,
            Bytes::from(sample_png(64, 64)),
            "image/png",
            TODAY,
            NOW,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::ImageProcessing(_)));
        assert!(f.storage.keys().is_empty());
        assert!(list_day(&f.st, f.session, TODAY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_presign_leaves_no_blobs() {
        let f = fixture_with_storage(
            StubAnalysis {
                photo: Some(lunch()),
                ..Default::default()
            },
            MemoryStorage::failing_presign_on("_thumb"),
        );
        let err = create_from_photo(&f.st, f.session, Bytes::from(sample_png(64, 64)), "image/png", TODAY, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ImageProcessing(_)));
        assert!(f.storage.keys().is_empty());
        assert!(list_day(&f.st, f.session, TODAY).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn future_date_is_rejected_before_any_call() {
        let f = fixture(StubAnalysis {
            photo: Some(lunch()),
            ..Default::default()
        });
        let err = create_from_photo(
            &f.st,
            f.session,
            Bytes::from(sample_png(8, 8)),
            "image/png",
            date!(2024 - 06 - 06),
            NOW,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(f.stub.photo_calls(), 0);
    }

    #[tokio::test]
    async fn text_plate_has_no_image() {
        let f = fixture(StubAnalysis {
            meal: Some(lunch()),
            ..Default::default()
        });
        let plate = create_from_text(&f.st, f.session, "pollo con arroz", TODAY, NOW)
            .await
            .unwrap();
        assert!(!plate.has_image());
        assert_eq!(plate.content.totals().total_kcal, 380.0);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let f = fixture(StubAnalysis {
            meal: Some(lunch()),
            ..Default::default()
        });
        let plate = create_from_text(&f.st, f.session, "pollo", TODAY, NOW).await.unwrap();

        let edit = PlateEdit {
            description: Some("Pollo al curry".into()),
            ..Default::default()
        };
        let updated = update(&f.st, f.session, plate.id, edit.clone(), Some(plate.version), NOW)
            .await
            .unwrap();
        assert_eq!(updated.version, plate.version + 1);
        assert_eq!(updated.created_at, plate.created_at);

        let err = update(&f.st, f.session, plate.id, edit.clone(), Some(plate.version), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // no version supplied: last writer wins
        update(&f.st, f.session, plate.id, edit, None, NOW).await.unwrap();
    }

    #[tokio::test]
    async fn component_edit_recomputes_totals() {
        let f = fixture(StubAnalysis {
            meal: Some(lunch()),
            ..Default::default()
        });
        let plate = create_from_text(&f.st, f.session, "pollo", TODAY, NOW).await.unwrap();

        let rescaled = rescale_ingredient(&f.st, f.session, plate.id, 1, 200.0, None).await.unwrap();
        assert_eq!(rescaled.content.components()[1].kcal, 260.0);
        assert_eq!(rescaled.content.totals().total_kcal, 510.0);

        let edited = update(
            &f.st,
            f.session,
            plate.id,
            PlateEdit {
                components: Some(vec![ing("Pollo", 150.0, 250.0)]),
                ..Default::default()
            },
            None,
            NOW,
        )
        .await
        .unwrap();
        assert_eq!(edited.content.totals().total_kcal, 250.0);

        let removed = remove_ingredient(&f.st, f.session, plate.id, 0, None).await.unwrap();
        assert_eq!(removed.content.totals().total_kcal, 0.0);
    }

    #[tokio::test]
    async fn rescale_round_trip_keeps_stored_values() {
        let f = fixture(StubAnalysis {
            meal: Some(PlateAnalysis {
                description: "Arroz".into(),
                components: vec![Ingredient {
                    name: "Arroz".into(),
                    weight: 150.0,
                    kcal: 195.0,
                    protein_weight: 4.0,
                    carbohydrates_weight: 42.0,
                    fats_weight: 0.5,
                    baseline: None,
                }],
            }),
            ..Default::default()
        });
        let plate = create_from_text(&f.st, f.session, "arroz", TODAY, NOW).await.unwrap();

        rescale_ingredient(&f.st, f.session, plate.id, 0, 1.0, None).await.unwrap();
        let back = rescale_ingredient(&f.st, f.session, plate.id, 0, 150.0, None).await.unwrap();
        let rice = &back.content.components()[0];
        assert_eq!(
            (rice.kcal, rice.protein_weight, rice.carbohydrates_weight, rice.fats_weight),
            (195.0, 4.0, 42.0, 0.5)
        );

        let err = rescale_ingredient(&f.st, f.session, plate.id, 0, 0.0, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let doubled = rescale_ingredient(&f.st, f.session, plate.id, 0, 300.0, None).await.unwrap();
        assert_eq!(doubled.content.components()[0].kcal, 390.0);
        assert_eq!(doubled.content.totals().total_kcal, 390.0);
    }

    #[tokio::test]
    async fn added_ingredient_is_appended_once() {
        let f = fixture(StubAnalysis {
            meal: Some(lunch()),
            ingredient: Some(ing("Salsa", 30.0, 60.0)),
            ..Default::default()
        });
        let plate = create_from_text(&f.st, f.session, "pollo", TODAY, NOW).await.unwrap();

        let once = add_ingredient(&f.st, f.session, plate.id, "un poco de salsa", None).await.unwrap();
        assert_eq!(once.content.components().len(), 3);
        assert_eq!(once.content.totals().total_kcal, 440.0);

        let twice = add_ingredient(&f.st, f.session, plate.id, "un poco de salsa", None).await.unwrap();
        assert_eq!(twice.content.components().len(), 3);
        assert_eq!(twice.version, once.version);
    }

    #[tokio::test]
    async fn edited_ingredient_keeps_unreturned_fields() {
        let f = fixture(StubAnalysis {
            meal: Some(lunch()),
            patch: Some(IngredientPatch {
                weight: Some(200.0),
                kcal: Some(260.0),
                fats_weight: Some(0.0),
                ..Default::default()
            }),
            ..Default::default()
        });
        let plate = create_from_text(&f.st, f.session, "pollo", TODAY, NOW).await.unwrap();

        let edited = edit_ingredient(&f.st, f.session, plate.id, 1, "el doble de arroz", None)
            .await
            .unwrap();
        let rice = &edited.content.components()[1];
        assert_eq!((rice.name.as_str(), rice.weight, rice.kcal, rice.fats_weight), ("Arroz", 200.0, 260.0, 5.0));
        assert_eq!(edited.content.totals().total_kcal, 510.0);

        let sent = f.stub.last_edit().expect("edit request sent");
        assert_eq!((sent.index, sent.name.as_str()), (1, "Arroz"));

        let err = edit_ingredient(&f.st, f.session, plate.id, 9, "x", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn favorites_are_searchable_and_copyable() {
        let f = fixture(StubAnalysis {
            meal: Some(lunch()),
            ..Default::default()
        });
        let plate = create_from_text(&f.st, f.session, "pollo", date!(2024 - 06 - 02), NOW)
            .await
            .unwrap();

        let err = create_from_favorite(&f.st, f.session, plate.id, TODAY, NOW).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        set_favorite(&f.st, f.session, plate.id, true).await.unwrap();
        assert_eq!(list_favorites(&f.st, f.session, Some("ARROZ")).await.unwrap().len(), 1);
        assert!(list_favorites(&f.st, f.session, Some("lentejas")).await.unwrap().is_empty());

        let copy = create_from_favorite(&f.st, f.session, plate.id, TODAY, NOW).await.unwrap();
        assert_eq!(copy.content.description, "Pollo con arroz");
        assert!(!copy.is_favorite);
        assert_eq!(list_day(&f.st, f.session, TODAY).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn image_can_be_replaced_and_reissued() {
        let f = fixture(StubAnalysis {
            meal: Some(lunch()),
            ..Default::default()
        });
        let plate = create_from_text(&f.st, f.session, "pollo", TODAY, NOW).await.unwrap();
        assert!(matches!(
            image_url(&f.st, f.session, plate.id, Rendition::Large).await.unwrap_err(),
            AppError::NotFound(_)
        ));

        let updated = replace_image(&f.st, f.session, plate.id, Bytes::from(sample_png(32, 32)), NOW)
            .await
            .unwrap();
        assert!(updated.has_image());
        let url = image_url(&f.st, f.session, plate.id, Rendition::Thumb).await.unwrap();
        assert!(url.contains("1717581600000_thumb.jpg"));
    }

    #[tokio::test]
    async fn delete_is_owner_scoped() {
        let f = fixture(StubAnalysis {
            meal: Some(lunch()),
            ..Default::default()
        });
        let plate = create_from_text(&f.st, f.session, "pollo", TODAY, NOW).await.unwrap();
        let stranger = session_created(datetime!(2024-06-01 8:00 UTC));
        assert!(matches!(delete(&f.st, stranger, plate.id).await.unwrap_err(), AppError::NotFound(_)));
        delete(&f.st, f.session, plate.id).await.unwrap();
        assert!(matches!(get(&f.st, f.session, plate.id).await.unwrap_err(), AppError::NotFound(_)));
    }
}
