use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::browser::{Lease, SessionOptions};
use crate::core::models::AnalysisRequest;
use crate::core::types::{PipelineStage, Thoroughness};
use crate::services::ServiceContext;
use crate::services::assembler::default_report;
use crate::services::pipeline::run_analysis;
use crate::services::types::{Outcome, ServiceError};

pub(crate) fn session_options(ctx: &ServiceContext, mode: Thoroughness) -> SessionOptions {
    SessionOptions {
        // thorough 模式要求截图完整，不拦截资源
        block_heavy_resources: ctx.config.browser.block_heavy_resources && mode != Thoroughness::Thorough,
    }
}

/// 打开浏览器会话，失败时返回 None 让流水线降级
pub(crate) async fn open_lease(reservation: crate::browser::Reservation, options: SessionOptions) -> Option<Lease> {
    match reservation.open(options).await {
        Ok(lease) => Some(lease),
        Err(e) => {
            warn!("❌ 打开浏览器会话失败: {}", e);
            None
        }
    }
}

/// 入口：在截止时间内完成一次分析，超时返回默认报告
pub async fn analyze(ctx: Arc<ServiceContext>, request: AnalysisRequest) -> Result<Outcome, ServiceError> {
    let started = Instant::now();
    let deadline = ctx.config.timeouts.request_deadline();
    let deadline_ms = deadline.as_millis() as u64;

    let reservation = ctx.pool.reserve().await?;
    info!("🚀 开始分析 {} (模式 {:?})", request.url, request.mode);

    let (stage_tx, stage_rx) = watch::channel(PipelineStage::Init);
    let options = session_options(&ctx, request.mode);
    let portfolio_url = request.url.clone();

    let task_ctx = ctx.clone();
    let mut handle = tokio::spawn(async move {
        let lease = open_lease(reservation, options).await;
        run_analysis(task_ctx, request, lease, stage_tx).await
    });

    let remaining = deadline.saturating_sub(started.elapsed());
    tokio::select! {
        joined = &mut handle => {
            let total_ms = started.elapsed().as_millis() as u64;
            match joined {
                Ok(assembly) => {
                    info!(
                        "✅ 分析完成: {} 总分 {}，耗时 {}ms，降级字段 {} 个",
                        portfolio_url,
                        assembly.report.overall_score,
                        total_ms,
                        assembly.degraded.len()
                    );
                    Ok(Outcome {
                        report: assembly.report,
                        degraded: assembly.degraded,
                        timed_out: false,
                        stage_reached: PipelineStage::Assembled,
                        total_ms,
                        deadline_ms,
                    })
                }
                Err(e) => {
                    error!("❌ 分析流水线异常终止: {}", e);
                    Err(ServiceError::Crashed(e.to_string()))
                }
            }
        }
        _ = tokio::time::sleep(remaining) => {
            handle.abort();
            let stage_reached = *stage_rx.borrow();
            warn!("⏱️ 分析超过截止时间 {}ms，停在 {} 阶段，返回默认报告", deadline_ms, stage_reached);
            let assembly = default_report(&portfolio_url, &ctx.config.scoring.defaults, Utc::now());
            Ok(Outcome {
                report: assembly.report,
                degraded: assembly.degraded,
                timed_out: true,
                stage_reached,
                total_ms: started.elapsed().as_millis() as u64,
                deadline_ms,
            })
        }
    }
}
