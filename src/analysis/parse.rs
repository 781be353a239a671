use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use super::AnalysisError;
use crate::plates::model::Ingredient;

/// Meal analysis as returned by the photo and manual-text scenarios.
/// Totals in the payload are ignored; they are always recomputed from the components.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PlateAnalysis {
    pub description: String,
    pub components: Vec<Ingredient>,
}

/// Partial ingredient returned by the edit scenario. Missing or zero fields keep the
/// previous value.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct IngredientPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub kcal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub protein_weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub carbohydrates_weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub fats_weight: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ActivityAnalysis {
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub kcal: f64,
}

/// Removes the Markdown code fence the webhooks sometimes wrap their JSON in.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut body = raw.trim();
    for opening in ["```json\n", "```json\r\n", "```\n"] {
        if let Some(rest) = body.strip_prefix(opening) {
            body = rest;
            break;
        }
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

pub fn parse_body<T: DeserializeOwned>(raw: &str) -> Result<T, AnalysisError> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| AnalysisError::Malformed(e.to_string()))
}

/// Accepts numbers, numeric strings and null (as 0).
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_f64(deserializer)?.unwrap_or(0.0))
}

pub fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a number, got '{s}'"))),
        Some(other) => Err(D::Error::custom(format!("expected a number, got {other}"))),
    }
}
