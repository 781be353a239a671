use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::calendar::DayBounds;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub name: String,
    pub kcal: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub date: OffsetDateTime,
    pub name: String,
    pub kcal: f64,
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn insert(&self, activity: NewActivity) -> anyhow::Result<Activity>;
    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Activity>>;
    async fn list_between(&self, user_id: Uuid, range: DayBounds) -> anyhow::Result<Vec<Activity>>;
    async fn update(&self, activity: &Activity) -> anyhow::Result<Option<Activity>>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

const ACTIVITY_COLUMNS: &str = "id, user_id, date, name, kcal, created_at, updated_at";

pub struct PgActivityRepository {
    db: PgPool,
}

impl PgActivityRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn insert(&self, activity: NewActivity) -> anyhow::Result<Activity> {
        let row = sqlx::query_as::<_, Activity>(&format!(
            r#"
            INSERT INTO activities (user_id, date, name, kcal)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(activity.user_id)
        .bind(activity.date)
        .bind(&activity.name)
        .bind(activity.kcal)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Activity>> {
        let row = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_between(&self, user_id: Uuid, range: DayBounds) -> anyhow::Result<Vec<Activity>> {
        let rows = sqlx::query_as::<_, Activity>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
              FROM activities
             WHERE user_id = $1 AND date >= $2 AND date <= $3
             ORDER BY date ASC, created_at ASC
            "#
        ))
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update(&self, activity: &Activity) -> anyhow::Result<Option<Activity>> {
        let row = sqlx::query_as::<_, Activity>(&format!(
            r#"
            UPDATE activities SET date = $3, name = $4, kcal = $5, updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(activity.id)
        .bind(activity.user_id)
        .bind(activity.date)
        .bind(&activity.name)
        .bind(activity.kcal)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM activities WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[derive(Default)]
pub struct MemoryActivityRepository {
    activities: Mutex<Vec<Activity>>,
}

impl MemoryActivityRepository {
    fn with<T>(&self, f: impl FnOnce(&mut Vec<Activity>) -> T) -> anyhow::Result<T> {
        let mut guard = self
            .activities
            .lock()
            .map_err(|_| anyhow::anyhow!("activity store lock poisoned"))?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl ActivityRepository for MemoryActivityRepository {
    async fn insert(&self, activity: NewActivity) -> anyhow::Result<Activity> {
        let now = OffsetDateTime::now_utc();
        let stored = Activity {
            id: Uuid::new_v4(),
            user_id: activity.user_id,
            date: activity.date,
            name: activity.name,
            kcal: activity.kcal,
            created_at: now,
            updated_at: now,
        };
        self.with(|all| all.push(stored.clone()))?;
        Ok(stored)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Activity>> {
        self.with(|all| all.iter().find(|a| a.id == id && a.user_id == user_id).cloned())
    }

    async fn list_between(&self, user_id: Uuid, range: DayBounds) -> anyhow::Result<Vec<Activity>> {
        self.with(|all| {
            let mut found: Vec<Activity> = all
                .iter()
                .filter(|a| a.user_id == user_id && range.contains(a.date))
                .cloned()
                .collect();
            found.sort_by_key(|a| (a.date, a.created_at));
            found
        })
    }

    async fn update(&self, activity: &Activity) -> anyhow::Result<Option<Activity>> {
        self.with(|all| {
            all.iter_mut()
                .find(|a| a.id == activity.id && a.user_id == activity.user_id)
                .map(|slot| {
                    slot.date = activity.date;
                    slot.name = activity.name.clone();
                    slot.kcal = activity.kcal;
                    slot.updated_at = OffsetDateTime::now_utc();
                    slot.clone()
                })
        })
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        self.with(|all| {
            let before = all.len();
            all.retain(|a| !(a.id == id && a.user_id == user_id));
            all.len() != before
        })
    }
}
