use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{LoaderId, SetBlockedUrLsParams};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventFrameNavigated, EventLifecycleEvent, FrameId, NavigateParams,
    SetLifecycleEventsEnabledParams,
};
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use phf::phf_map;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{BrowserSession, SessionFactory, SessionOptions};
use crate::app::config::BrowserSettings;
use crate::core::types::{CaptureKind, LoadStrategy, Viewport};

/// 重资源拦截规则，按资源类别分组
static HEAVY_RESOURCE_PATTERNS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "image" => &["*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico"],
    "font" => &["*.woff", "*.woff2", "*.ttf", "*.otf"],
    "media" => &["*.mp4", "*.webm", "*.mov", "*.mp3"],
    "stylesheet" => &["*.css"],
};

const HIDE_WEBDRIVER_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined })";

pub fn blocked_url_patterns() -> Vec<String> {
    let mut patterns: Vec<String> = HEAVY_RESOURCE_PATTERNS
        .values()
        .flat_map(|group| group.iter().map(|p| p.to_string()))
        .collect();
    patterns.sort();
    patterns
}

/// 启动进程内共享的无头浏览器
pub async fn launch_headless_browser(settings: &BrowserSettings) -> Result<Browser> {
    let viewport = CdpViewport {
        width: Viewport::DESKTOP.width,
        height: Viewport::DESKTOP.height,
        ..Default::default()
    };

    let mut builder = BrowserConfig::builder()
        .viewport(viewport)
        .arg(format!("--user-agent={}", settings.user_agent))
        .arg("--no-sandbox")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions");
    if let Some(path) = &settings.chrome_path {
        builder = builder.chrome_executable(path);
    }
    let config = builder.build().map_err(anyhow::Error::msg)?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("启动无头浏览器失败")?;

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("浏览器事件处理出错: {}", e);
            }
        }
        warn!("浏览器事件循环已结束");
    });

    Ok(browser)
}

/// 在共享浏览器里为每个请求新开标签页
pub struct ChromiumFactory {
    browser: Arc<Browser>,
}

impl ChromiumFactory {
    pub fn new(browser: Browser) -> Self {
        Self {
            browser: Arc::new(browser),
        }
    }
}

async fn prepare_page(page: &Page, options: SessionOptions) -> Result<()> {
    page.evaluate_on_new_document(HIDE_WEBDRIVER_JS).await?;
    page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;

    if options.block_heavy_resources {
        page.execute(SetBlockedUrLsParams::new(blocked_url_patterns()))
            .await
            .context("设置资源拦截失败")?;
        debug!("已开启重资源拦截");
    }
    Ok(())
}

#[async_trait]
impl SessionFactory for ChromiumFactory {
    async fn open(&self, options: SessionOptions) -> Result<Box<dyn BrowserSession>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("创建新标签页失败")?;

        // 标签页已经存在，初始化失败也要关掉
        if let Err(e) = prepare_page(&page, options).await {
            if let Err(close_err) = page.close().await {
                debug!("关闭初始化失败的标签页出错: {}", close_err);
            }
            return Err(e.context("初始化标签页失败"));
        }

        Ok(Box::new(ChromiumSession { page }))
    }
}

pub struct ChromiumSession {
    page: Page,
}

impl ChromiumSession {
    /// 发起导航并等到策略要求的时刻
    ///
    /// chromiumoxide 的导航命令要等到 load 事件才返回，所以不能先等它：
    /// 导航回复和主框架的事件一起监听，谁先满足条件就返回，未完成的导航直接丢弃。
    async fn navigate_until(&self, url: &str, strategy: LoadStrategy) -> Result<()> {
        let mut lifecycle = self.page.event_listener::<EventLifecycleEvent>().await?;
        let mut navigated = self.page.event_listener::<EventFrameNavigated>().await?;
        let main_frame = self.page.mainframe().await?;

        let navigate = self.page.execute(NavigateParams::new(url));
        tokio::pin!(navigate);
        let mut navigate_pending = true;
        // 新文档的 loader，提交之前的生命周期事件都属于旧文档
        let mut loader: Option<LoaderId> = None;

        loop {
            tokio::select! {
                reply = &mut navigate, if navigate_pending => {
                    navigate_pending = false;
                    let reply = reply?;
                    if let Some(error_text) = reply.result.error_text.as_ref() {
                        bail!("导航失败: {}", error_text);
                    }
                    // 回复到达说明 load 已触发，DOMContentLoaded 和提交必然已满足
                    if strategy != LoadStrategy::NetworkIdle {
                        return Ok(());
                    }
                    if loader.is_none() {
                        loader = reply.result.loader_id.clone();
                    }
                }
                Some(event) = navigated.next() => {
                    if !is_main_frame(main_frame.as_ref(), &event.frame.id, event.frame.parent_id.as_ref())
                        || event.frame.url == "about:blank"
                    {
                        continue;
                    }
                    if strategy == LoadStrategy::Commit {
                        debug!("已提交: {}", event.frame.url);
                        return Ok(());
                    }
                    loader = Some(event.frame.loader_id.clone());
                }
                Some(event) = lifecycle.next() => {
                    let Some(wanted) = strategy.lifecycle_event() else {
                        continue;
                    };
                    let same_document = loader.as_ref().is_some_and(|id| *id == event.loader_id);
                    if same_document
                        && is_main_frame(main_frame.as_ref(), &event.frame_id, None)
                        && event.name == wanted
                    {
                        return Ok(());
                    }
                }
                else => bail!("生命周期事件流提前结束"),
            }
        }
    }
}

fn is_main_frame(main_frame: Option<&FrameId>, frame_id: &FrameId, parent_id: Option<&FrameId>) -> bool {
    match main_frame {
        Some(main) => main == frame_id,
        None => parent_id.is_none(),
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn load(&self, url: &str, strategy: LoadStrategy, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.navigate_until(url, strategy))
            .await
            .map_err(|_| anyhow!("{:?} 加载超时 ({}ms)", strategy, timeout.as_millis()))?
    }

    async fn page_html(&self) -> Result<String> {
        self.page.content().await.context("读取页面 HTML 失败")
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn screenshot(&self, kind: CaptureKind) -> Result<Vec<u8>> {
        let viewport = kind.viewport();
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                viewport.width as i64,
                viewport.height as i64,
                1.0,
                viewport.mobile,
            ))
            .await
            .context("设置视口失败")?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(kind.full_page())
            .build();
        self.page
            .screenshot(params)
            .await
            .with_context(|| format!("{} 截图失败", kind.slug()))
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_patterns_cover_every_group() {
        let patterns = blocked_url_patterns();
        assert!(patterns.contains(&"*.png".to_string()));
        assert!(patterns.contains(&"*.woff2".to_string()));
        assert!(patterns.contains(&"*.css".to_string()));
        let expected: usize = HEAVY_RESOURCE_PATTERNS.values().map(|g| g.len()).sum();
        assert_eq!(patterns.len(), expected);
    }

    /// 本地服务：首页正常返回，/hang.png 只收请求不回复，页面的 load 事件永远不会触发
    async fn serve_page_with_hanging_image() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let n = stream.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    if request.starts_with("GET /hang") {
                        tokio::time::sleep(Duration::from_secs(600)).await;
                        return;
                    }
                    let body = "<html><head><title>Slow</title></head><body><h1>Hello</h1><img src=\"/hang.png\"></body></html>";
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    #[ignore] // 需要本机安装 Chromium
    async fn test_weaker_strategies_succeed_without_load_event() {
        let url = serve_page_with_hanging_image().await;
        let browser = launch_headless_browser(&BrowserSettings::default()).await.unwrap();
        let factory = ChromiumFactory::new(browser);
        let session = factory.open(SessionOptions::default()).await.unwrap();

        let idle = session
            .load(&url, LoadStrategy::NetworkIdle, Duration::from_secs(2))
            .await;
        assert!(idle.is_err(), "图片一直挂起时 networkIdle 不应成功");

        session
            .load(&url, LoadStrategy::DomContentLoaded, Duration::from_secs(5))
            .await
            .expect("DOMContentLoaded 不需要等 load 事件");
        assert!(session.page_html().await.unwrap().contains("<h1>Hello</h1>"));

        session
            .load(&url, LoadStrategy::Commit, Duration::from_secs(5))
            .await
            .expect("提交即可返回");
        session.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore] // 需要本机安装 Chromium
    async fn test_headless_load_and_screenshot() {
        let browser = launch_headless_browser(&BrowserSettings::default()).await.unwrap();
        let factory = ChromiumFactory::new(browser);
        let session = factory.open(SessionOptions::default()).await.unwrap();

        session
            .load(
                "data:text/html,<title>Hi</title><h1>Hello</h1>",
                LoadStrategy::DomContentLoaded,
                Duration::from_secs(10),
            )
            .await
            .unwrap();
        let html = session.page_html().await.unwrap();
        assert!(html.contains("<h1>Hello</h1>"));

        let png = session.screenshot(CaptureKind::DesktopFold).await.unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        session.close().await.unwrap();
    }
}
