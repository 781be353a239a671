//! Client side of the external analysis webhooks: retry policy, response parsing and
//! one typed call per scenario.

pub mod parse;
pub mod retry;
pub mod webhook;

use thiserror::Error;

pub use parse::{ActivityAnalysis, IngredientPatch, PlateAnalysis};
pub use webhook::{AnalysisClient, IngredientEditRequest, WebhookAnalysisClient};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis service answered HTTP {status} after {attempts} attempts")]
    Status { status: u16, attempts: u32 },

    #[error("analysis service unreachable after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed analysis response: {0}")]
    Malformed(String),
}
