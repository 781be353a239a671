use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::profile::{Profile, Sex};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    /// Account creation instant. Never changes after registration.
    pub created_at: OffsetDateTime,
    pub sex: Option<String>,
    pub age: Option<i32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub bmr: i32,
}

impl User {
    pub fn profile(&self) -> Profile {
        Profile {
            sex: self.sex.as_deref().and_then(Sex::parse),
            age: self.age,
            weight_kg: self.weight_kg,
            height_cm: self.height_cm,
            bmr: self.bmr,
        }
    }
}
