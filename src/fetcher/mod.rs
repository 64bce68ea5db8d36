pub mod classify;
pub mod extract;

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::BrowserSession;
use crate::core::models::ExtractedContent;
use crate::core::types::LoadStrategy;

pub use classify::classify_case_studies;
pub use extract::{ExtractLimits, extract_content};

/// 依次尝试加载策略，返回成功的那一个；全部失败返回 None
pub async fn load_with_ladder(
    session: &dyn BrowserSession,
    url: &str,
    budget: Duration,
) -> Option<LoadStrategy> {
    for (strategy, timeout) in LoadStrategy::ladder(budget) {
        if timeout.is_zero() {
            continue;
        }
        debug!("尝试 {:?} 加载 {}，超时 {}ms", strategy, url, timeout.as_millis());
        match session.load(url, strategy, timeout).await {
            Ok(()) => {
                info!("✓ 页面已加载 ({:?}): {}", strategy, url);
                return Some(strategy);
            }
            Err(e) => warn!("{:?} 加载失败: {}", strategy, e),
        }
    }
    None
}

/// 加载并提取页面；任何失败都降级为占位内容而不是报错
pub async fn fetch_page(
    session: &dyn BrowserSession,
    url: &str,
    budget: Duration,
    limits: &ExtractLimits,
) -> ExtractedContent {
    if load_with_ladder(session, url, budget).await.is_none() {
        warn!("❌ 所有加载策略均失败，使用占位内容: {}", url);
        return ExtractedContent::unavailable(url);
    }
    read_page(session, url, limits).await
}

/// 从已加载的页面读取 HTML 并提取内容
pub async fn read_page(session: &dyn BrowserSession, url: &str, limits: &ExtractLimits) -> ExtractedContent {
    let final_url = session
        .current_url()
        .await
        .ok()
        .filter(|u| u.starts_with("http"))
        .unwrap_or_else(|| url.to_string());

    let extracted = match session.page_html().await {
        Ok(html) => extract_content(&html, &final_url, limits),
        Err(e) => Err(e),
    };

    match extracted {
        Ok(content) => {
            debug!(
                "提取到标题 '{}'，{} 个词，{} 个链接",
                content.title,
                content.word_count,
                content.links.len()
            );
            content
        }
        Err(e) => {
            warn!("页面内容提取失败: {}，继续使用占位内容", e);
            ExtractedContent {
                loaded: true,
                ..ExtractedContent::unavailable(&final_url)
            }
        }
    }
}
