use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Ingredient, Plate, PlateContent, PlateImage};

#[derive(Debug, FromRow)]
pub struct PlateRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: OffsetDateTime,
    pub description: String,
    pub components: Json<Vec<Ingredient>>,
    pub is_favorite: bool,
    pub has_image: bool,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub image_id: Option<String>,
    pub image_hash: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub version: i32,
}

impl From<PlateRow> for Plate {
    fn from(r: PlateRow) -> Self {
        // totals are rebuilt from the components, the stored columns only serve queries
        let image = match (r.has_image, r.image_id, r.image_url) {
            (true, Some(image_id), Some(image_url)) => Some(PlateImage {
                image_id,
                image_url,
                thumbnail_url: r.thumbnail_url,
                image_hash: r.image_hash,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            user_id: r.user_id,
            date: r.date,
            content: PlateContent::new(r.description, r.components.0),
            is_favorite: r.is_favorite,
            image,
            created_at: r.created_at,
            updated_at: r.updated_at,
            version: r.version,
        }
    }
}
