use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;
use url::Url;

use crate::core::models::AnalysisRequest;
use crate::core::types::Thoroughness;
use crate::services;
use crate::web::AppState;
use crate::web::response::{AnalyzeResponse, ApiError, HealthResponse, ReviewResponse};

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// 去掉首尾空白，缺少协议时补 https://，只接受带主机名的 http(s) 地址
pub fn normalize_url(raw: Option<&str>) -> Result<String, ApiError> {
    let trimmed = raw.map(str::trim).unwrap_or("");
    if trimmed.is_empty() {
        return Err(ApiError::MissingUrl("url must be a non-empty string".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl(format!("unsupported scheme: {}", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ApiError::InvalidUrl(format!("missing host: {}", trimmed)));
    }
    Ok(parsed.to_string())
}

fn parse_mode(raw: Option<&str>) -> Result<Thoroughness, ApiError> {
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(Thoroughness::default()),
        Some(mode) => serde_json::from_value(Value::String(mode.to_ascii_lowercase()))
            .map_err(|_| ApiError::InvalidMode(format!("mode must be quick, standard or thorough, got '{}'", mode))),
    }
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::MissingUrl(e.body_text()))?;
    let url = normalize_url(body.url.as_deref())?;
    let mode = parse_mode(body.mode.as_deref())?;

    info!("📥 收到分析请求: {} ({:?})", url, mode);
    let outcome = services::analyze(state.ctx.clone(), AnalysisRequest { url, mode }).await?;
    Ok(Json(outcome.into()))
}

pub async fn review(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ReviewBody>, JsonRejection>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::MissingReviewFields(e.body_text()))?;
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::MissingReviewFields("email must be a non-empty string".to_string()))?
        .to_string();
    let url = normalize_url(body.url.as_deref()).map_err(|e| match e {
        ApiError::MissingUrl(details) => ApiError::MissingReviewFields(details),
        other => other,
    })?;

    let outcome = services::review(state.ctx.clone(), email, url).await?;
    Ok(Json(ReviewResponse {
        success: true,
        screenshot_url: outcome.screenshot_url,
    }))
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.started.elapsed().as_secs(),
        active_sessions: state.ctx.pool.active_sessions(),
        max_sessions: state.ctx.pool.max_sessions(),
    })
}

pub async fn describe() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            {"method": "POST", "path": "/analyze", "body": {"url": "string", "mode": "quick | standard | thorough"}},
            {"method": "POST", "path": "/review", "body": {"email": "string", "url": "string"}},
            {"method": "GET", "path": "/healthz"},
        ],
    }))
}
