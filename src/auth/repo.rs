use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::profile::Profile;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, email: &str, password_hash: &str) -> anyhow::Result<User>;
    /// Stores the body data together with its derived BMR.
    async fn update_profile(&self, id: Uuid, profile: &Profile) -> anyhow::Result<Option<User>>;
}

const USER_COLUMNS: &str = "id, email, password_hash, created_at, sex, age, weight_kg, height_cm, bmr";

pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, email: &str, password_hash: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, profile: &Profile) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET sex = $2, age = $3, weight_kg = $4, height_cm = $5, bmr = $6
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(profile.sex.map(|s| s.as_str()))
        .bind(profile.age)
        .bind(profile.weight_kg)
        .bind(profile.height_cm)
        .bind(profile.bmr)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<User>>,
}

impl MemoryUserRepository {
    /// Inserts a user with a chosen creation instant.
    pub fn seed(&self, email: &str, created_at: OffsetDateTime) -> anyhow::Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: String::new(),
            created_at,
            sex: None,
            age: None,
            weight_kg: None,
            height_cm: None,
            bmr: 0,
        };
        self.users
            .lock()
            .map_err(|_| anyhow::anyhow!("user store lock poisoned"))?
            .push(user.clone());
        Ok(user)
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> anyhow::Result<Option<User>> {
        let users = self
            .users
            .lock()
            .map_err(|_| anyhow::anyhow!("user store lock poisoned"))?;
        Ok(users.iter().find(|u| pred(u)).cloned())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.find(|u| u.email == email)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        self.find(|u| u.id == id)
    }

    async fn create(&self, email: &str, password_hash: &str) -> anyhow::Result<User> {
        anyhow::ensure!(self.find(|u| u.email == email)?.is_none(), "duplicate email {email}");
        let mut user = self.seed(email, OffsetDateTime::now_utc())?;
        user.password_hash = password_hash.to_string();
        let mut users = self
            .users
            .lock()
            .map_err(|_| anyhow::anyhow!("user store lock poisoned"))?;
        if let Some(slot) = users.iter_mut().find(|u| u.id == user.id) {
            *slot = user.clone();
        }
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, profile: &Profile) -> anyhow::Result<Option<User>> {
        let mut users = self
            .users
            .lock()
            .map_err(|_| anyhow::anyhow!("user store lock poisoned"))?;
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.sex = profile.sex.map(|s| s.as_str().to_string());
            u.age = profile.age;
            u.weight_kg = profile.weight_kg;
            u.height_cm = profile.height_cm;
            u.bmr = profile.bmr;
            u.clone()
        }))
    }
}
