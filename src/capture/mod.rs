pub mod temp;

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::BrowserSession;
use crate::core::models::ScreenshotSet;
use crate::core::types::CaptureKind;
use crate::storage::{ObjectStore, screenshot_key};

pub use temp::TempArtifact;

/// 截图 key 中使用的页面标签：host + path
pub fn page_label(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("page");
            let path = parsed.path().trim_matches('/');
            if path.is_empty() {
                host.to_string()
            } else {
                format!("{}-{}", host, path)
            }
        }
        Err(_) => url.to_string(),
    }
}

/// 截图、落临时文件、上传、换成公开地址
pub struct Capturer {
    store: Arc<dyn ObjectStore>,
    temp_dir: PathBuf,
    key_prefix: Option<String>,
}

impl Capturer {
    pub fn new(store: Arc<dyn ObjectStore>, temp_dir: PathBuf, key_prefix: Option<String>) -> Self {
        Self {
            store,
            temp_dir,
            key_prefix,
        }
    }

    /// 单张截图；任何一步失败都返回 None，不影响请求
    pub async fn capture_one(&self, session: &dyn BrowserSession, kind: CaptureKind, label: &str) -> Option<String> {
        let bytes = match session.screenshot(kind).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("⚠️ {} 截图失败，跳过: {}", kind.slug(), e);
                return None;
            }
        };

        let artifact = match TempArtifact::write(&self.temp_dir, &bytes).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("⚠️ 截图写入临时文件失败: {}", e);
                return None;
            }
        };

        let key = screenshot_key(self.key_prefix.as_deref(), label, kind, Utc::now());
        debug!("📤 上传截图 {} ({} 字节)", key, bytes.len());
        match self.store.upload_file(artifact.path(), &key, "image/png").await {
            Ok(()) => {
                let url = self.store.public_url(&key);
                info!("✓ 截图已上传: {}", url);
                Some(url)
            }
            Err(e) => {
                warn!("❌ 截图上传失败: {}", e);
                None
            }
        }
    }

    /// 按顺序拍摄给定种类的截图，当前页面必须已加载
    pub async fn capture_set(&self, session: &dyn BrowserSession, kinds: &[CaptureKind], label: &str) -> ScreenshotSet {
        let mut shots = ScreenshotSet::default();
        for &kind in kinds {
            let url = self.capture_one(session, kind, label).await;
            shots.set(kind, url);
        }
        shots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{SessionFactory, SessionOptions};
    use crate::core::types::LoadStrategy;
    use crate::testing::{FakeBrowser, MemoryStore};
    use std::time::Duration;

    fn count_files(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    async fn loaded_session(browser: &FakeBrowser) -> Box<dyn BrowserSession> {
        let session = browser.open(SessionOptions::default()).await.unwrap();
        session
            .load("https://jane.design/", LoadStrategy::Commit, Duration::from_secs(1))
            .await
            .unwrap();
        session
    }

    #[test]
    fn test_page_label() {
        assert_eq!(page_label("https://jane.design/"), "jane.design");
        assert_eq!(page_label("https://jane.design/work/a/"), "jane.design-work/a");
    }

    #[tokio::test]
    async fn test_capture_set_uploads_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let capturer = Capturer::new(store.clone(), dir.path().to_path_buf(), None);
        let browser = FakeBrowser::new().with_page("https://jane.design/", "<p>hi</p>");
        let session = loaded_session(&browser).await;

        let before = count_files(dir.path());
        let shots = capturer
            .capture_set(
                session.as_ref(),
                &[CaptureKind::DesktopFull, CaptureKind::DesktopFold],
                "jane.design",
            )
            .await;

        assert!(shots.desktop_full.as_deref().unwrap().starts_with("https://cdn.test/screenshots/"));
        assert!(shots.desktop_fold.is_some());
        assert!(shots.mobile_full.is_none(), "未请求的种类应为空");
        assert_eq!(store.uploads().len(), 2);
        assert_eq!(count_files(dir.path()), before, "临时文件数量应与之前一致");
    }

    #[tokio::test]
    async fn test_upload_failure_gives_null_url_and_no_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let capturer = Capturer::new(Arc::new(MemoryStore::failing()), dir.path().to_path_buf(), None);
        let browser = FakeBrowser::new().with_page("https://jane.design/", "<p>hi</p>");
        let session = loaded_session(&browser).await;

        let shots = capturer
            .capture_set(session.as_ref(), &[CaptureKind::MobileFull], "jane.design")
            .await;
        assert!(shots.is_empty());
        assert_eq!(count_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_render_failure_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let capturer = Capturer::new(store.clone(), dir.path().to_path_buf(), Some("reviews".into()));
        let browser = FakeBrowser::new()
            .with_page("https://jane.design/", "<p>hi</p>")
            .failing_screenshots();
        let session = loaded_session(&browser).await;

        let shots = capturer
            .capture_set(session.as_ref(), &[CaptureKind::DesktopFold], "jane.design")
            .await;
        assert!(shots.is_empty());
        assert!(store.uploads().is_empty());
    }
}
