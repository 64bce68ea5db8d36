pub mod audit;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

use crate::core::types::CaptureKind;
use crate::utils::text::sanitize_key_segment;

pub use audit::{AuditStore, DisabledAudit, RestAuditStore};

/// 对象存储：上传本地文件并给出公开访问地址
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_file(&self, local_path: &Path, key: &str, content_type: &str) -> Result<()>;
    fn public_url(&self, key: &str) -> String;
}

/// 未配置对象存储时使用，上传总是失败，截图地址因此为空
pub struct DisabledStore;

#[async_trait]
impl ObjectStore for DisabledStore {
    async fn upload_file(&self, _local_path: &Path, _key: &str, _content_type: &str) -> Result<()> {
        Err(anyhow!("对象存储未配置"))
    }

    fn public_url(&self, key: &str) -> String {
        key.to_string()
    }
}

/// 生成不会冲突的截图 key：时间戳 + 随机后缀
pub fn screenshot_key(
    prefix: Option<&str>,
    label: &str,
    kind: CaptureKind,
    now: DateTime<Utc>,
) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    let name = format!(
        "screenshots/{}/{}-{}-{}-{}.png",
        now.format("%Y%m%d"),
        now.timestamp_millis(),
        &suffix[..8],
        sanitize_key_segment(label),
        kind.slug()
    );
    let prefix = prefix
        .map(|p| p.trim().trim_start_matches('/').trim_end_matches('/'))
        .filter(|p| !p.is_empty());
    match prefix {
        Some(p) => format!("{}/{}", p, name),
        None => name,
    }
}
