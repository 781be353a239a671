//! Body data and the basal metabolic rate derived from it.

pub mod handlers;

use serde::{Deserialize, Serialize};

pub use handlers::router;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }

    pub fn parse(value: &str) -> Option<Sex> {
        match value {
            "male" => Some(Sex::Male),
            "female" => Some(Sex::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    pub sex: Option<Sex>,
    pub age: Option<i32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    /// kcal/day, 0 while any body datum is missing.
    pub bmr: i32,
}

impl Profile {
    pub fn new(sex: Option<Sex>, age: Option<i32>, weight_kg: Option<f64>, height_cm: Option<f64>) -> Self {
        Self {
            sex,
            age,
            weight_kg,
            height_cm,
            bmr: compute_bmr(sex, age, weight_kg, height_cm),
        }
    }
}

/// Mifflin-St Jeor.
pub fn compute_bmr(sex: Option<Sex>, age: Option<i32>, weight_kg: Option<f64>, height_cm: Option<f64>) -> i32 {
    let (Some(sex), Some(age), Some(weight), Some(height)) = (sex, age, weight_kg, height_cm) else {
        return 0;
    };
    if age <= 0 || weight <= 0.0 || height <= 0.0 {
        return 0;
    }
    let base = 10.0 * weight + 6.25 * height - 5.0 * age as f64;
    let adjusted = match sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    };
    adjusted.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mifflin_st_jeor() {
        // 700 + 1093.75 - 150 + 5
        assert_eq!(compute_bmr(Some(Sex::Male), Some(30), Some(70.0), Some(175.0)), 1649);
        // 600 + 1031.25 - 125 - 161
        assert_eq!(compute_bmr(Some(Sex::Female), Some(25), Some(60.0), Some(165.0)), 1345);
    }

    #[test]
    fn missing_or_zero_input_gives_zero() {
        assert_eq!(compute_bmr(None, Some(30), Some(70.0), Some(175.0)), 0);
        assert_eq!(compute_bmr(Some(Sex::Male), Some(0), Some(70.0), Some(175.0)), 0);
        assert_eq!(compute_bmr(Some(Sex::Male), Some(30), None, Some(175.0)), 0);
        assert_eq!(compute_bmr(Some(Sex::Female), Some(30), Some(70.0), Some(0.0)), 0);
    }

    #[test]
    fn sex_round_trips_through_storage_text() {
        for s in [Sex::Male, Sex::Female] {
            assert_eq!(Sex::parse(s.as_str()), Some(s));
        }
        assert_eq!(Sex::parse("other"), None);
    }
}
