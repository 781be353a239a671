use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::model::{NewPlate, Plate, PlateImage};
use super::repo_types::PlateRow;
use crate::calendar::DayBounds;

/// Result of a versioned update.
#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(Plate),
    NotFound,
    /// The stored version differs from the one the caller edited.
    Stale,
}

/// Meal ("plate") records, always scoped by owner.
#[async_trait]
pub trait PlateRepository: Send + Sync {
    async fn insert(&self, plate: NewPlate) -> anyhow::Result<Plate>;
    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Plate>>;
    /// Plates whose date falls inside `range`, oldest first.
    async fn list_between(&self, user_id: Uuid, range: DayBounds) -> anyhow::Result<Vec<Plate>>;
    /// Plates inside `range` carrying `hash`, in creation order.
    async fn find_by_hash(&self, user_id: Uuid, range: DayBounds, hash: &str) -> anyhow::Result<Vec<Plate>>;
    async fn list_favorites(&self, user_id: Uuid) -> anyhow::Result<Vec<Plate>>;
    /// Writes every mutable field. `expected_version = None` is last-writer-wins.
    async fn update(&self, plate: &Plate, expected_version: Option<i32>) -> anyhow::Result<UpdateOutcome>;
    async fn set_favorite(&self, user_id: Uuid, id: Uuid, is_favorite: bool) -> anyhow::Result<Option<Plate>>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

const PLATE_COLUMNS: &str = "id, user_id, date, description, components, is_favorite, has_image, \
     image_url, thumbnail_url, image_id, image_hash, created_at, updated_at, version";

pub struct PgPlateRepository {
    db: PgPool,
}

impl PgPlateRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn image_columns(image: &Option<PlateImage>) -> (bool, Option<String>, Option<String>, Option<String>, Option<String>) {
    match image {
        Some(i) => (
            true,
            Some(i.image_url.clone()),
            i.thumbnail_url.clone(),
            Some(i.image_id.clone()),
            i.image_hash.clone(),
        ),
        None => (false, None, None, None, None),
    }
}

#[async_trait]
impl PlateRepository for PgPlateRepository {
    async fn insert(&self, plate: NewPlate) -> anyhow::Result<Plate> {
        let totals = plate.content.totals();
        let (has_image, image_url, thumbnail_url, image_id, image_hash) = image_columns(&plate.image);
        let row = sqlx::query_as::<_, PlateRow>(&format!(
            r#"
            INSERT INTO plates (user_id, date, description, components,
                                total_kcal, total_weight, total_protein_weight,
                                total_carbohydrates_weight, total_fats_weight,
                                is_favorite, has_image, image_url, thumbnail_url, image_id, image_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {PLATE_COLUMNS}
            "#
        ))
        .bind(plate.user_id)
        .bind(plate.date)
        .bind(&plate.content.description)
        .bind(Json(plate.content.components().to_vec()))
        .bind(totals.total_kcal)
        .bind(totals.total_weight)
        .bind(totals.total_protein_weight)
        .bind(totals.total_carbohydrates_weight)
        .bind(totals.total_fats_weight)
        .bind(plate.is_favorite)
        .bind(has_image)
        .bind(image_url)
        .bind(thumbnail_url)
        .bind(image_id)
        .bind(image_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Plate>> {
        let row = sqlx::query_as::<_, PlateRow>(&format!(
            "SELECT {PLATE_COLUMNS} FROM plates WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_between(&self, user_id: Uuid, range: DayBounds) -> anyhow::Result<Vec<Plate>> {
        let rows = sqlx::query_as::<_, PlateRow>(&format!(
            r#"
            SELECT {PLATE_COLUMNS}
              FROM plates
             WHERE user_id = $1 AND date >= $2 AND date <= $3
             ORDER BY date ASC, created_at ASC
            "#
        ))
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_hash(&self, user_id: Uuid, range: DayBounds, hash: &str) -> anyhow::Result<Vec<Plate>> {
        let rows = sqlx::query_as::<_, PlateRow>(&format!(
            r#"
            SELECT {PLATE_COLUMNS}
              FROM plates
             WHERE user_id = $1 AND date >= $2 AND date <= $3 AND image_hash = $4
             ORDER BY created_at ASC
            "#
        ))
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .bind(hash)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_favorites(&self, user_id: Uuid) -> anyhow::Result<Vec<Plate>> {
        let rows = sqlx::query_as::<_, PlateRow>(&format!(
            "SELECT {PLATE_COLUMNS} FROM plates WHERE user_id = $1 AND is_favorite ORDER BY description ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, plate: &Plate, expected_version: Option<i32>) -> anyhow::Result<UpdateOutcome> {
        let totals = plate.content.totals();
        let (has_image, image_url, thumbnail_url, image_id, image_hash) = image_columns(&plate.image);
        let row = sqlx::query_as::<_, PlateRow>(&format!(
            r#"
            UPDATE plates
               SET date = $3, description = $4, components = $5,
                   total_kcal = $6, total_weight = $7, total_protein_weight = $8,
                   total_carbohydrates_weight = $9, total_fats_weight = $10,
                   is_favorite = $11, has_image = $12, image_url = $13, thumbnail_url = $14,
                   image_id = $15, image_hash = $16,
                   updated_at = now(), version = version + 1
             WHERE id = $1 AND user_id = $2 AND ($17::int IS NULL OR version = $17)
            RETURNING {PLATE_COLUMNS}
            "#
        ))
        .bind(plate.id)
        .bind(plate.user_id)
        .bind(plate.date)
        .bind(&plate.content.description)
        .bind(Json(plate.content.components().to_vec()))
        .bind(totals.total_kcal)
        .bind(totals.total_weight)
        .bind(totals.total_protein_weight)
        .bind(totals.total_carbohydrates_weight)
        .bind(totals.total_fats_weight)
        .bind(plate.is_favorite)
        .bind(has_image)
        .bind(image_url)
        .bind(thumbnail_url)
        .bind(image_id)
        .bind(image_hash)
        .bind(expected_version)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(r) => Ok(UpdateOutcome::Updated(r.into())),
            None if self.get(plate.user_id, plate.id).await?.is_some() => Ok(UpdateOutcome::Stale),
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    async fn set_favorite(&self, user_id: Uuid, id: Uuid, is_favorite: bool) -> anyhow::Result<Option<Plate>> {
        let row = sqlx::query_as::<_, PlateRow>(&format!(
            r#"
            UPDATE plates SET is_favorite = $3, updated_at = now(), version = version + 1
             WHERE id = $1 AND user_id = $2
            RETURNING {PLATE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(is_favorite)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM plates WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
