use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::analysis::parse::{lenient_f64, IngredientPatch};
use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub kcal: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein_weight: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbohydrates_weight: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fats_weight: f64,
    /// Values before the first weight change. Later rescales start from here so rounding
    /// does not accumulate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<IngredientBaseline>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientBaseline {
    pub weight: f64,
    pub kcal: f64,
    pub protein_weight: f64,
    pub carbohydrates_weight: f64,
    pub fats_weight: f64,
}

impl Ingredient {
    fn current_values(&self) -> IngredientBaseline {
        IngredientBaseline {
            weight: self.weight,
            kcal: self.kcal,
            protein_weight: self.protein_weight,
            carbohydrates_weight: self.carbohydrates_weight,
            fats_weight: self.fats_weight,
        }
    }

    /// Same nutritional values, ignoring the rescale baseline.
    pub fn same_values(&self, other: &Ingredient) -> bool {
        self.name == other.name && self.current_values() == other.current_values()
    }

    /// Sets a new weight and rescales kcal and macros from the baseline. Returning to the
    /// baseline weight restores the baseline exactly. A zero baseline weight only changes
    /// the weight.
    pub fn rescaled(&self, new_weight: f64) -> Ingredient {
        let base = self.baseline.unwrap_or_else(|| self.current_values());
        let mut out = self.clone();
        out.baseline = Some(base);
        out.weight = new_weight;
        if base.weight <= 0.0 {
            return out;
        }
        if new_weight == base.weight {
            out.kcal = base.kcal;
            out.protein_weight = base.protein_weight;
            out.carbohydrates_weight = base.carbohydrates_weight;
            out.fats_weight = base.fats_weight;
            return out;
        }
        let ratio = new_weight / base.weight;
        out.kcal = (base.kcal * ratio).round();
        out.protein_weight = (base.protein_weight * ratio).round();
        out.carbohydrates_weight = (base.carbohydrates_weight * ratio).round();
        out.fats_weight = (base.fats_weight * ratio).round();
        out
    }

    pub fn apply_patch(&mut self, patch: &IngredientPatch) {
        fn pick(new: Option<f64>, old: f64) -> f64 {
            match new {
                Some(v) if v != 0.0 => v,
                _ => old,
            }
        }
        if let Some(name) = patch.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            self.name = name.to_string();
        }
        self.weight = pick(patch.weight, self.weight);
        self.kcal = pick(patch.kcal, self.kcal);
        self.protein_weight = pick(patch.protein_weight, self.protein_weight);
        self.carbohydrates_weight = pick(patch.carbohydrates_weight, self.carbohydrates_weight);
        self.fats_weight = pick(patch.fats_weight, self.fats_weight);
        self.baseline = None;
    }

    fn sanitized(mut self) -> Ingredient {
        self.name = self.name.trim().to_string();
        for v in [
            &mut self.weight,
            &mut self.kcal,
            &mut self.protein_weight,
            &mut self.carbohydrates_weight,
            &mut self.fats_weight,
        ] {
            if !v.is_finite() || *v < 0.0 {
                *v = 0.0;
            }
        }
        self
    }
}

/// Sums over the components of a plate. Never edited independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub total_kcal: f64,
    pub total_weight: f64,
    pub total_protein_weight: f64,
    pub total_carbohydrates_weight: f64,
    pub total_fats_weight: f64,
}

impl MacroTotals {
    pub fn from_components(components: &[Ingredient]) -> Self {
        components.iter().fold(Self::default(), |acc, c| Self {
            total_kcal: acc.total_kcal + c.kcal,
            total_weight: acc.total_weight + c.weight,
            total_protein_weight: acc.total_protein_weight + c.protein_weight,
            total_carbohydrates_weight: acc.total_carbohydrates_weight + c.carbohydrates_weight,
            total_fats_weight: acc.total_fats_weight + c.fats_weight,
        })
    }
}

/// Image attachment. Both renditions share `image_id`
/// (`{image_id}_large.jpg`, `{image_id}_thumb.jpg`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateImage {
    pub image_id: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub image_hash: Option<String>,
}

/// Nutritional content shared by stored plates and plates about to be created.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlateContent {
    pub description: String,
    components: Vec<Ingredient>,
    #[serde(flatten)]
    totals: MacroTotals,
}

impl PlateContent {
    pub fn new(description: impl Into<String>, components: Vec<Ingredient>) -> Self {
        let components: Vec<Ingredient> = components.into_iter().map(Ingredient::sanitized).collect();
        let totals = MacroTotals::from_components(&components);
        Self {
            description: description.into().trim().to_string(),
            components,
            totals,
        }
    }

    /// Content of a fresh analysis: components without a name or weight are dropped.
    pub fn from_analysis(description: impl Into<String>, components: Vec<Ingredient>) -> Self {
        let kept = components
            .into_iter()
            .filter(|c| !c.name.trim().is_empty() && c.weight > 0.0)
            .collect();
        Self::new(description, kept)
    }

    pub fn components(&self) -> &[Ingredient] {
        &self.components
    }

    pub fn totals(&self) -> MacroTotals {
        self.totals
    }

    fn recompute(&mut self) {
        self.totals = MacroTotals::from_components(&self.components);
    }

    fn component_mut(&mut self, index: usize) -> Result<&mut Ingredient, AppError> {
        self.components
            .get_mut(index)
            .ok_or_else(|| AppError::Validation(format!("ingredient {index} does not exist")))
    }

    /// Replaces all components. Values given explicitly become the new rescale reference.
    pub fn set_components(&mut self, components: Vec<Ingredient>) {
        self.components = components
            .into_iter()
            .map(|c| Ingredient {
                baseline: None,
                ..c.sanitized()
            })
            .collect();
        self.recompute();
    }

    pub fn rescale_ingredient(&mut self, index: usize, new_weight: f64) -> Result<(), AppError> {
        if !new_weight.is_finite() || new_weight <= 0.0 {
            return Err(AppError::Validation("weight must be greater than zero".into()));
        }
        let slot = self.component_mut(index)?;
        *slot = slot.rescaled(new_weight);
        self.recompute();
        Ok(())
    }

    /// Appends an ingredient unless it is identical to the current last one
    /// (the add scenario occasionally answers twice). Returns whether it was added.
    pub fn push_ingredient(&mut self, ingredient: Ingredient) -> bool {
        let ingredient = Ingredient {
            baseline: None,
            ..ingredient.sanitized()
        };
        if self.components.last().is_some_and(|last| last.same_values(&ingredient)) {
            return false;
        }
        self.components.push(ingredient);
        self.recompute();
        true
    }

    pub fn remove_ingredient(&mut self, index: usize) -> Result<Ingredient, AppError> {
        if index >= self.components.len() {
            return Err(AppError::Validation(format!("ingredient {index} does not exist")));
        }
        let removed = self.components.remove(index);
        self.recompute();
        Ok(removed)
    }

    pub fn patch_ingredient(&mut self, index: usize, patch: &IngredientPatch) -> Result<(), AppError> {
        let slot = self.component_mut(index)?;
        slot.apply_patch(patch);
        *slot = slot.clone().sanitized();
        self.recompute();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plate {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(flatten)]
    pub content: PlateContent,
    pub is_favorite: bool,
    pub image: Option<PlateImage>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub version: i32,
}

impl Plate {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// A plate before the store has assigned its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlate {
    pub user_id: Uuid,
    pub date: OffsetDateTime,
    pub content: PlateContent,
    pub is_favorite: bool,
    pub image: Option<PlateImage>,
}
