//! 单元测试共用的替身实现

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::browser::{BrowserSession, SessionFactory, SessionOptions};
use crate::core::models::AuditRecord;
use crate::core::types::{CaptureKind, LoadStrategy};
use crate::scoring::{ScoreDraft, Scorer, ScoringInput};
use crate::storage::{AuditStore, ObjectStore};

// ============ 浏览器 ============

#[derive(Clone, Default)]
struct FakeBrowserConfig {
    pages: HashMap<String, String>,
    fail_loads: bool,
    hang_network_idle: bool,
    load_delay: Option<Duration>,
    open_delay: Option<Duration>,
    fail_screenshots: bool,
}

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    loads: AtomicUsize,
    screenshots: AtomicUsize,
}

/// 内存里的"浏览器"：按 URL 返回预置 HTML，并统计各操作次数
#[derive(Clone, Default)]
pub struct FakeBrowser {
    config: Arc<FakeBrowserConfig>,
    counters: Arc<Counters>,
}

fn page_key(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        Arc::make_mut(&mut self.config)
            .pages
            .insert(page_key(url), html.to_string());
        self
    }

    /// 所有加载策略都失败
    pub fn failing_loads(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_loads = true;
        self
    }

    /// NetworkIdle 一直等到超时，其余策略正常
    pub fn hanging_network_idle(mut self) -> Self {
        Arc::make_mut(&mut self.config).hang_network_idle = true;
        self
    }

    /// 每次加载先等待一段时间（超过超时则失败）
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        Arc::make_mut(&mut self.config).load_delay = Some(delay);
        self
    }

    /// 打开标签页前先等待一段时间
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        Arc::make_mut(&mut self.config).open_delay = Some(delay);
        self
    }

    pub fn failing_screenshots(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_screenshots = true;
        self
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.counters.loads.load(Ordering::SeqCst)
    }

    pub fn screenshots(&self) -> usize {
        self.counters.screenshots.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for FakeBrowser {
    async fn open(&self, _options: SessionOptions) -> Result<Box<dyn BrowserSession>> {
        if let Some(delay) = self.config.open_delay {
            tokio::time::sleep(delay).await;
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            config: self.config.clone(),
            counters: self.counters.clone(),
            current: Mutex::new(None),
        }))
    }
}

pub struct FakeSession {
    config: Arc<FakeBrowserConfig>,
    counters: Arc<Counters>,
    current: Mutex<Option<String>>,
}

impl FakeSession {
    fn current(&self) -> Option<String> {
        self.current.lock().ok().and_then(|c| c.clone())
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn load(&self, url: &str, strategy: LoadStrategy, timeout: Duration) -> Result<()> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.config.load_delay {
            tokio::time::sleep(delay.min(timeout)).await;
            if delay > timeout {
                return Err(anyhow!("加载超时: {}", url));
            }
        }
        if self.config.fail_loads {
            return Err(anyhow!("net::ERR_CONNECTION_REFUSED"));
        }
        if self.config.hang_network_idle && strategy == LoadStrategy::NetworkIdle {
            tokio::time::sleep(timeout).await;
            return Err(anyhow!("等待 networkIdle 超时"));
        }
        if !self.config.pages.contains_key(&page_key(url)) {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED: {}", url));
        }

        if let Ok(mut current) = self.current.lock() {
            *current = Some(url.to_string());
        }
        Ok(())
    }

    async fn page_html(&self) -> Result<String> {
        let url = self.current().ok_or_else(|| anyhow!("页面尚未加载"))?;
        self.config
            .pages
            .get(&page_key(&url))
            .cloned()
            .ok_or_else(|| anyhow!("没有页面内容: {}", url))
    }

    async fn current_url(&self) -> Result<String> {
        self.current().ok_or_else(|| anyhow!("页面尚未加载"))
    }

    async fn screenshot(&self, kind: CaptureKind) -> Result<Vec<u8>> {
        self.counters.screenshots.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_screenshots {
            return Err(anyhow!("截图失败"));
        }
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(kind.slug().as_bytes());
        Ok(png)
    }

    async fn close(&self) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============ 对象存储 ============

/// 记录上传 key 的对象存储，公开地址为 https://cdn.test/{key}
#[derive(Default)]
pub struct MemoryStore {
    uploads: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload_file(&self, local_path: &Path, key: &str, _content_type: &str) -> Result<()> {
        let meta = tokio::fs::metadata(local_path).await?;
        if meta.len() == 0 {
            return Err(anyhow!("空文件"));
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("上传失败: 403 Forbidden"));
        }
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(key.to_string());
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }
}

/// 上传时直接 panic，模拟截图阶段的程序错误
pub struct PanickingStore;

#[async_trait]
impl ObjectStore for PanickingStore {
    async fn upload_file(&self, _local_path: &Path, key: &str, _content_type: &str) -> Result<()> {
        panic!("上传 {} 时出现未处理的错误", key);
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }
}

// ============ 评分 ============

/// 固定返回某个草稿的评分器，可设置延迟
pub struct FixedScorer {
    draft: Option<ScoreDraft>,
    delay: Duration,
    calls: AtomicUsize,
    completed: AtomicBool,
    inputs: Mutex<Vec<ScoringInput>>,
}

impl FixedScorer {
    pub fn new(draft: Option<ScoreDraft>) -> Self {
        Self {
            draft,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<ScoringInput> {
        self.inputs.lock().ok().and_then(|i| i.last().cloned())
    }
}

#[async_trait]
impl Scorer for FixedScorer {
    async fn score(&self, input: &ScoringInput) -> Option<ScoreDraft> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push(input.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.store(true, Ordering::SeqCst);
        self.draft.clone()
    }
}

/// 评分时直接 panic
pub struct PanickingScorer;

#[async_trait]
impl Scorer for PanickingScorer {
    async fn score(&self, _input: &ScoringInput) -> Option<ScoreDraft> {
        panic!("评分器内部错误");
    }
}

// ============ 审计 ============

#[derive(Default)]
pub struct RecordingAudit {
    records: Mutex<Vec<AuditRecord>>,
    fail: AtomicBool,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let audit = Self::default();
        audit.fail.store(true, Ordering::SeqCst);
        audit
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditStore for RecordingAudit {
    async fn insert(&self, record: &AuditRecord) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("审计存储不可用"));
        }
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        Ok(())
    }
}
