use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{NewPlate, Plate};
use super::repo::{PlateRepository, UpdateOutcome};
use crate::calendar::DayBounds;

/// Plate store kept in memory, with the same ordering and versioning rules as Postgres.
#[derive(Default)]
pub struct MemoryPlateRepository {
    plates: Mutex<Vec<Plate>>,
}

impl MemoryPlateRepository {
    fn with<T>(&self, f: impl FnOnce(&mut Vec<Plate>) -> T) -> anyhow::Result<T> {
        let mut guard = self
            .plates
            .lock()
            .map_err(|_| anyhow::anyhow!("plate store lock poisoned"))?;
        Ok(f(&mut guard))
    }
}

fn owned_by(user_id: Uuid, id: Uuid) -> impl Fn(&&mut Plate) -> bool {
    move |p| p.id == id && p.user_id == user_id
}

#[async_trait]
impl PlateRepository for MemoryPlateRepository {
    async fn insert(&self, plate: NewPlate) -> anyhow::Result<Plate> {
        let now = OffsetDateTime::now_utc();
        let stored = Plate {
            id: Uuid::new_v4(),
            user_id: plate.user_id,
            date: plate.date,
            content: plate.content,
            is_favorite: plate.is_favorite,
            image: plate.image,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        self.with(|all| all.push(stored.clone()))?;
        Ok(stored)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Plate>> {
        self.with(|all| {
            all.iter()
                .find(|p| p.id == id && p.user_id == user_id)
                .cloned()
        })
    }

    async fn list_between(&self, user_id: Uuid, range: DayBounds) -> anyhow::Result<Vec<Plate>> {
        self.with(|all| {
            let mut found: Vec<Plate> = all
                .iter()
                .filter(|p| p.user_id == user_id && range.contains(p.date))
                .cloned()
                .collect();
            found.sort_by_key(|p| (p.date, p.created_at));
            found
        })
    }

    async fn find_by_hash(&self, user_id: Uuid, range: DayBounds, hash: &str) -> anyhow::Result<Vec<Plate>> {
        self.with(|all| {
            let mut found: Vec<Plate> = all
                .iter()
                .filter(|p| p.user_id == user_id && range.contains(p.date))
                .filter(|p| p.image.as_ref().and_then(|i| i.image_hash.as_deref()) == Some(hash))
                .cloned()
                .collect();
            found.sort_by_key(|p| p.created_at);
            found
        })
    }

    async fn list_favorites(&self, user_id: Uuid) -> anyhow::Result<Vec<Plate>> {
        self.with(|all| {
            let mut found: Vec<Plate> = all
                .iter()
                .filter(|p| p.user_id == user_id && p.is_favorite)
                .cloned()
                .collect();
            found.sort_by(|a, b| a.content.description.cmp(&b.content.description));
            found
        })
    }

    async fn update(&self, plate: &Plate, expected_version: Option<i32>) -> anyhow::Result<UpdateOutcome> {
        self.with(|all| {
            let Some(slot) = all.iter_mut().find(owned_by(plate.user_id, plate.id)) else {
                return UpdateOutcome::NotFound;
            };
            if expected_version.is_some_and(|v| v != slot.version) {
                return UpdateOutcome::Stale;
            }
            slot.date = plate.date;
            slot.content = plate.content.clone();
            slot.is_favorite = plate.is_favorite;
            slot.image = plate.image.clone();
            slot.updated_at = OffsetDateTime::now_utc();
            slot.version += 1;
            UpdateOutcome::Updated(slot.clone())
        })
    }

    async fn set_favorite(&self, user_id: Uuid, id: Uuid, is_favorite: bool) -> anyhow::Result<Option<Plate>> {
        self.with(|all| {
            all.iter_mut().find(owned_by(user_id, id)).map(|slot| {
                slot.is_favorite = is_favorite;
                slot.updated_at = OffsetDateTime::now_utc();
                slot.version += 1;
                slot.clone()
            })
        })
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        self.with(|all| {
            let before = all.len();
            all.retain(|p| !(p.id == id && p.user_id == user_id));
            all.len() != before
        })
    }
}
