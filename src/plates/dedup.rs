use time::{OffsetDateTime, UtcOffset};
use tracing::debug;
use uuid::Uuid;

use super::model::{NewPlate, Plate, PlateContent};
use super::repo::PlateRepository;
use crate::calendar::{day_bounds, local_date, noon};

pub const COPY_PREFIX: &str = "Copia de ";

/// Earliest plate of the same user and calendar day whose original upload hashed to `hash`.
pub async fn find_duplicate(
    repo: &dyn PlateRepository,
    user_id: Uuid,
    day: OffsetDateTime,
    offset: UtcOffset,
    hash: &str,
) -> anyhow::Result<Option<Plate>> {
    let bounds = day_bounds(local_date(day, offset), offset);
    let found = repo.find_by_hash(user_id, bounds, hash).await?;
    if let Some(first) = found.first() {
        debug!(%user_id, original = %first.id, "duplicate image detected");
    }
    Ok(found.into_iter().next())
}

/// New plate copying the nutritional content and image of `original`.
/// Identity and timestamps are assigned again when it is stored.
pub fn template_from(original: &Plate, date: OffsetDateTime) -> NewPlate {
    NewPlate {
        user_id: original.user_id,
        date,
        content: PlateContent::new(
            format!("{COPY_PREFIX}{}", original.content.description),
            original.content.components().to_vec(),
        ),
        is_favorite: false,
        image: original.image.clone(),
    }
}

/// Copy of a favorite placed on another day. Keeps the description as is.
pub fn from_favorite(favorite: &Plate, date: time::Date) -> NewPlate {
    NewPlate {
        user_id: favorite.user_id,
        date: noon(date),
        content: favorite.content.clone(),
        is_favorite: false,
        image: favorite.image.clone(),
    }
}
