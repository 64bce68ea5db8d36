use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::core::models::AnalysisReport;
use crate::core::types::PipelineStage;
use crate::services::{Outcome, ServiceError};

/// HTTP 层的错误，`error` 字段是固定文案，`details` 给出具体原因
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("URL is required")]
    MissingUrl(String),
    #[error("Invalid URL")]
    InvalidUrl(String),
    #[error("Invalid mode")]
    InvalidMode(String),
    #[error("Email and URL are required")]
    MissingReviewFields(String),
    #[error("Server busy")]
    Busy(String),
    #[error("Analysis failed")]
    Failed(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUrl(_)
            | ApiError::InvalidUrl(_)
            | ApiError::InvalidMode(_)
            | ApiError::MissingReviewFields(_) => StatusCode::BAD_REQUEST,
            ApiError::Busy(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> &str {
        match self {
            ApiError::MissingUrl(d)
            | ApiError::InvalidUrl(d)
            | ApiError::InvalidMode(d)
            | ApiError::MissingReviewFields(d)
            | ApiError::Busy(d)
            | ApiError::Failed(d) => d,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Busy(busy) => ApiError::Busy(busy.to_string()),
            ServiceError::Crashed(details) => ApiError::Failed(details),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("请求失败 {}: {} ({})", status.as_u16(), self, self.details());
        let body = json!({
            "success": false,
            "error": self.to_string(),
            "details": self.details(),
        });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub total_ms: u64,
    pub deadline_ms: u64,
    pub timed_out: bool,
    pub stage_reached: PipelineStage,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub data: AnalysisReport,
    pub timing: Timing,
    pub degraded: Vec<String>,
}

impl From<Outcome> for AnalyzeResponse {
    fn from(outcome: Outcome) -> Self {
        Self {
            success: true,
            data: outcome.report,
            timing: Timing {
                total_ms: outcome.total_ms,
                deadline_ms: outcome.deadline_ms,
                timed_out: outcome.timed_out,
                stage_reached: outcome.stage_reached,
            },
            degraded: outcome.degraded,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub screenshot_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
    pub max_sessions: usize,
}
