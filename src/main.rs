mod app;
mod ask_llm;
mod browser;
mod capture;
mod core;
mod fetcher;
mod logger;
mod scoring;
mod services;
mod storage;
mod tencent_cos;
mod utils;
mod web;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppConfig;
use crate::browser::{ChromiumFactory, SessionFactory, UnavailableBrowser, launch_headless_browser};
use crate::scoring::{LlmScorer, Scorer};
use crate::services::ServiceContext;
use crate::storage::{AuditStore, DisabledAudit, DisabledStore, ObjectStore, RestAuditStore};
use crate::tencent_cos::{CosConfig, CosS3Client};
use crate::web::AppState;

// ============================================================================
// 组件装配
// ============================================================================

async fn build_browser(config: &AppConfig) -> Arc<dyn SessionFactory> {
    match launch_headless_browser(&config.browser).await {
        Ok(browser) => {
            info!("✓ 无头浏览器已启动");
            Arc::new(ChromiumFactory::new(browser))
        }
        Err(e) => {
            warn!("❌ 无头浏览器启动失败: {}，所有页面将使用占位内容", e);
            Arc::new(UnavailableBrowser)
        }
    }
}

fn build_store(config: &AppConfig) -> Result<Arc<dyn ObjectStore>> {
    if !config.storage.is_configured() {
        warn!("⚠️ 未配置对象存储，截图地址将为空");
        return Ok(Arc::new(DisabledStore));
    }
    let cos = CosConfig::from_storage(&config.storage)?;
    info!("✓ 对象存储: bucket {}", cos.bucket);
    Ok(Arc::new(CosS3Client::new(cos, None)))
}

fn build_audit(config: &AppConfig) -> Arc<dyn AuditStore> {
    match RestAuditStore::from_config(&config.audit) {
        Some(store) => {
            info!("✓ 审计存储表: {}", config.audit.table);
            Arc::new(store)
        }
        None => {
            warn!("⚠️ 未配置审计存储，review 记录只写日志");
            Arc::new(DisabledAudit)
        }
    }
}

fn build_scorer(config: &AppConfig) -> Arc<dyn Scorer> {
    if config.scoring.api_key.is_none() {
        warn!("⚠️ 未配置 LLM_API_KEY，所有分析将使用默认分数");
    }
    Arc::new(LlmScorer::new(
        config.scoring.clone(),
        config.timeouts.score_timeout(),
        config.extraction.max_prompt_chars,
    ))
}

// ============================================================================
// 主函数
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();

    let config = AppConfig::from_env()?;
    info!("🚀 作品集分析服务启动中 (配置版本 {})", config.version);
    info!(
        "📊 会话上限 {}，请求截止 {}ms，评分超时 {}ms",
        config.server.max_sessions, config.timeouts.request_deadline_ms, config.timeouts.score_timeout_ms
    );

    let factory = build_browser(&config).await;
    let store = build_store(&config)?;
    let audit = build_audit(&config);
    let scorer = build_scorer(&config);

    let port = config.server.port;
    let ctx = Arc::new(ServiceContext::new(config, factory, store, scorer, audit));
    web::serve(Arc::new(AppState::new(ctx)), port).await?;

    info!("👋 服务已停止");
    Ok(())
}
