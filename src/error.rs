use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::analysis::AnalysisError;

/// Errors surfaced at the operation boundary (save meal, save activity, toggle favorite...).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} was modified concurrently")]
    Conflict(&'static str),

    #[error("analysis service failed: {0}")]
    Upstream(AnalysisError),

    #[error("analysis response could not be parsed: {0}")]
    MalformedResponse(String),

    #[error("image processing failed: {0}")]
    ImageProcessing(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) | AppError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::ImageProcessing(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short message shown to the user. Upstream and internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::Unauthorized(msg) => msg.clone(),
            AppError::NotFound(_) | AppError::Conflict(_) => self.to_string(),
            AppError::Upstream(_) | AppError::MalformedResponse(_) => {
                "Error processing the analysis. Please try again.".into()
            }
            AppError::ImageProcessing(_) => "Image processing failed".into(),
            AppError::Internal(_) => "Error saving the data. Please try again.".into(),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Malformed(msg) => AppError::MalformedResponse(msg),
            other => AppError::Upstream(other),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("record"),
            other => AppError::Internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            error!(error = %self, %status, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_analysis_maps_to_its_own_kind() {
        let err: AppError = AnalysisError::Malformed("expected value".into()).into();
        assert!(matches!(err, AppError::MalformedResponse(_)));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        assert!(!err.public_message().contains("10.0.0.3"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = AppError::Validation("date cannot be after today".into());
        assert_eq!(err.public_message(), "date cannot be after today");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
