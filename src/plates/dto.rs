use serde::Deserialize;
use uuid::Uuid;

use super::model::Ingredient;
use crate::images::versioner::Rendition;

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct FavoritesQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MealTextRequest {
    pub instructions: String,
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct FromFavoriteRequest {
    pub favorite_id: Uuid,
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlateRequest {
    pub description: Option<String>,
    pub date: Option<String>,
    pub components: Option<Vec<Ingredient>>,
    pub is_favorite: Option<bool>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub is_favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct WeightRequest {
    pub weight: f64,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct IngredientInstructions {
    pub instructions: String,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    #[default]
    Large,
    Thumb,
}

impl From<ImageSize> for Rendition {
    fn from(size: ImageSize) -> Self {
        match size {
            ImageSize::Large => Rendition::Large,
            ImageSize::Thumb => Rendition::Thumb,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub size: ImageSize,
}
