use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::capture::page_label;
use crate::core::models::AuditRecord;
use crate::core::types::{CaptureKind, Thoroughness};
use crate::fetcher::load_with_ladder;
use crate::services::ServiceContext;
use crate::services::orchestrator::{open_lease, session_options};
use crate::services::types::{ReviewOutcome, ReviewStatus, ServiceError};

/// 旧版 review：加载页面，拍一张首屏截图，异步写审计记录
pub async fn review(ctx: Arc<ServiceContext>, email: String, url: String) -> Result<ReviewOutcome, ServiceError> {
    let started = Instant::now();
    let deadline = ctx.config.timeouts.request_deadline();
    let reservation = ctx.pool.reserve().await?;
    info!("📸 开始 review 截图: {}", url);

    let options = session_options(&ctx, Thoroughness::Standard);
    let task_ctx = ctx.clone();
    let task_url = url.clone();
    let mut handle = tokio::spawn(async move {
        let lease = open_lease(reservation, options).await?;
        let session = lease.session();
        let shot = match load_with_ladder(session, &task_url, task_ctx.config.timeouts.load_budget()).await {
            Some(_) => {
                task_ctx
                    .capturer
                    .capture_one(session, CaptureKind::DesktopFold, &page_label(&task_url))
                    .await
            }
            None => None,
        };
        lease.close().await;
        shot
    });

    let remaining = deadline.saturating_sub(started.elapsed());
    let outcome = tokio::select! {
        joined = &mut handle => {
            let screenshot_url = joined.map_err(|e| ServiceError::Crashed(e.to_string()))?;
            let status = if screenshot_url.is_some() {
                ReviewStatus::Pending
            } else {
                ReviewStatus::CaptureFailed
            };
            ReviewOutcome { screenshot_url, status }
        }
        _ = tokio::time::sleep(remaining) => {
            handle.abort();
            warn!("⏱️ review 超过截止时间 {}ms: {}", deadline.as_millis(), url);
            ReviewOutcome {
                screenshot_url: None,
                status: ReviewStatus::TimedOut,
            }
        }
    };

    let record = AuditRecord {
        email,
        url,
        status: outcome.status.as_str().to_string(),
        screenshot_url: outcome.screenshot_url.clone(),
        created_at: Utc::now(),
    };
    let audit = ctx.audit.clone();
    tokio::spawn(async move {
        if let Err(e) = audit.insert(&record).await {
            warn!("⚠️ 审计记录写入失败 ({} {}): {}", record.email, record.status, e);
        }
    });

    Ok(outcome)
}
