use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::{debug, instrument};

use super::parse::{parse_body, ActivityAnalysis, IngredientPatch, PlateAnalysis};
use super::retry::RetryPolicy;
use super::AnalysisError;
use crate::config::WebhookConfig;
use crate::plates::model::{Ingredient, PlateContent};

/// Body sent to the edit-ingredient scenario.
#[derive(Debug, Clone, Serialize)]
pub struct IngredientEditRequest {
    pub plate: PlateContent,
    pub instructions: String,
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct Instructions<'a> {
    instructions: &'a str,
}

/// Typed access to the analysis scenarios. Their internal behaviour is opaque.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze_photo(&self, image: Bytes, content_type: &str) -> Result<PlateAnalysis, AnalysisError>;
    async fn parse_meal_text(&self, instructions: &str) -> Result<PlateAnalysis, AnalysisError>;
    async fn parse_activity_text(&self, instructions: &str) -> Result<ActivityAnalysis, AnalysisError>;
    async fn add_ingredient(&self, instructions: &str) -> Result<Ingredient, AnalysisError>;
    async fn edit_ingredient(&self, request: &IngredientEditRequest) -> Result<IngredientPatch, AnalysisError>;
}

#[derive(Clone)]
pub struct WebhookAnalysisClient {
    http: reqwest::Client,
    urls: WebhookConfig,
    retry: RetryPolicy,
}

impl WebhookAnalysisClient {
    pub fn new(urls: WebhookConfig, retry: RetryPolicy) -> Self {
        Self {
            http: reqwest::Client::new(),
            urls,
            retry,
        }
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<String, AnalysisError> {
        let res = self.retry.send(|| self.http.post(url).json(body)).await?;
        read_text(res).await
    }
}

async fn read_text(res: reqwest::Response) -> Result<String, AnalysisError> {
    let text = res
        .text()
        .await
        .map_err(|e| AnalysisError::Malformed(format!("unreadable body: {e}")))?;
    debug!(bytes = text.len(), "analysis response received");
    Ok(text)
}

#[async_trait]
impl AnalysisClient for WebhookAnalysisClient {
    #[instrument(skip(self, image), fields(size = image.len()))]
    async fn analyze_photo(&self, image: Bytes, content_type: &str) -> Result<PlateAnalysis, AnalysisError> {
        let url = self.urls.photo_analysis_url.as_str();
        let res = self
            .retry
            .send(|| {
                let part = Part::bytes(image.to_vec())
                    .file_name("plate.jpg")
                    .mime_str(content_type)
                    .unwrap_or_else(|_| Part::bytes(image.to_vec()).file_name("plate.jpg"));
                self.http.post(url).multipart(Form::new().part("image", part))
            })
            .await?;
        parse_body(&read_text(res).await?)
    }

    #[instrument(skip(self))]
    async fn parse_meal_text(&self, instructions: &str) -> Result<PlateAnalysis, AnalysisError> {
        let body = self
            .post_json(&self.urls.meal_text_url, &Instructions { instructions })
            .await?;
        parse_body(&body)
    }

    #[instrument(skip(self))]
    async fn parse_activity_text(&self, instructions: &str) -> Result<ActivityAnalysis, AnalysisError> {
        let body = self
            .post_json(&self.urls.activity_text_url, &Instructions { instructions })
            .await?;
        parse_body(&body)
    }

    #[instrument(skip(self))]
    async fn add_ingredient(&self, instructions: &str) -> Result<Ingredient, AnalysisError> {
        let body = self
            .post_json(&self.urls.add_ingredient_url, &Instructions { instructions })
            .await?;
        parse_body(&body)
    }

    #[instrument(skip(self, request), fields(index = request.index))]
    async fn edit_ingredient(&self, request: &IngredientEditRequest) -> Result<IngredientPatch, AnalysisError> {
        let body = self.post_json(&self.urls.edit_ingredient_url, request).await?;
        parse_body(&body)
    }
}
