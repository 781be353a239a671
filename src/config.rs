use std::time::Duration;

use serde::Deserialize;
use time::UtcOffset;

use crate::analysis::retry::{Backoff, RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Lifetime of presigned download URLs.
    pub url_ttl_secs: u64,
}

/// One URL per analysis scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub photo_analysis_url: String,
    pub meal_text_url: String,
    pub activity_text_url: String,
    pub add_ingredient_url: String,
    pub edit_ingredient_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// "exponential" (default) or "linear".
    pub backoff: String,
}

impl AnalysisRetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        let backoff = match self.backoff.as_str() {
            "linear" => Backoff::Linear,
            _ => Backoff::default(),
        };
        RetryPolicy {
            max_retries: self.max_retries.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            backoff,
        }
    }
}

const MAX_OFFSET_MINUTES: i32 = 11 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub webhooks: WebhookConfig,
    pub retry: AnalysisRetryConfig,
    /// Offset used to decide what "today" is and where day boundaries fall.
    pub reference_offset_minutes: i32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "esferico".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "esferico-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("MINIO_ENDPOINT")?,
            bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "esferico".into()),
            access_key: std::env::var("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            url_ttl_secs: env_parse("MINIO_URL_TTL_SECS", 7 * 24 * 60 * 60),
        };
        let webhooks = WebhookConfig {
            photo_analysis_url: std::env::var("WEBHOOK_PHOTO_ANALYSIS_URL")?,
            meal_text_url: std::env::var("WEBHOOK_MEAL_TEXT_URL")?,
            activity_text_url: std::env::var("WEBHOOK_ACTIVITY_TEXT_URL")?,
            add_ingredient_url: std::env::var("WEBHOOK_ADD_INGREDIENT_URL")?,
            edit_ingredient_url: std::env::var("WEBHOOK_EDIT_INGREDIENT_URL")?,
        };
        let retry = AnalysisRetryConfig {
            max_retries: env_parse("ANALYSIS_MAX_RETRIES", 5),
            base_delay_ms: env_parse("ANALYSIS_BASE_DELAY_MS", 1000),
            backoff: std::env::var("ANALYSIS_BACKOFF").unwrap_or_else(|_| "exponential".into()),
        };
        let reference_offset_minutes = env_parse("REFERENCE_UTC_OFFSET_MINUTES", 120);

        let config = Self {
            database_url,
            jwt,
            storage,
            webhooks,
            retry,
            reference_offset_minutes,
        };
        config.reference_offset()?;
        Ok(config)
    }

    /// At most ±11h, so that noon UTC stays inside the same local calendar day.
    pub fn reference_offset(&self) -> anyhow::Result<UtcOffset> {
        let minutes = self.reference_offset_minutes;
        anyhow::ensure!(
            (-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes),
            "REFERENCE_UTC_OFFSET_MINUTES must be within ±{MAX_OFFSET_MINUTES}, got {minutes}"
        );
        let hours = i8::try_from(minutes / 60)?;
        let rest = i8::try_from(minutes % 60)?;
        Ok(UtcOffset::from_hms(hours, rest, 0)?)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
