pub mod headless;
pub mod pool;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::core::types::{CaptureKind, LoadStrategy};

pub use headless::{ChromiumFactory, launch_headless_browser};
pub use pool::{BrowserPool, Lease, PoolBusy, Reservation};

/// 打开会话时的选项
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// 拦截图片、字体、样式等重资源以加快加载
    pub block_heavy_resources: bool,
}

/// 一个浏览器标签页，流水线只通过这个接口操作浏览器
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 用指定策略导航，超时即失败
    async fn load(&self, url: &str, strategy: LoadStrategy, timeout: Duration) -> Result<()>;
    /// 当前页面完整 HTML
    async fn page_html(&self) -> Result<String>;
    /// 重定向后的最终地址
    async fn current_url(&self) -> Result<String>;
    /// 按截图种类设置视口并返回 PNG 数据
    async fn screenshot(&self, kind: CaptureKind) -> Result<Vec<u8>>;
    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, options: SessionOptions) -> Result<Box<dyn BrowserSession>>;
}

/// 浏览器启动失败时的替身：所有加载都会降级为占位内容
pub struct UnavailableBrowser;

#[async_trait]
impl SessionFactory for UnavailableBrowser {
    async fn open(&self, _options: SessionOptions) -> Result<Box<dyn BrowserSession>> {
        Err(anyhow::anyhow!("无头浏览器不可用"))
    }
}
