use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// 截图临时文件；无论上传成功与否，离开作用域（包括任务被中止）时删除
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    pub async fn write(dir: &Path, bytes: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("创建临时目录失败: {}", dir.display()))?;
        let path = dir.join(format!("{}.png", Uuid::new_v4().simple()));
        // 先登记再写入，写一半失败也会被清理
        let artifact = Self { path };
        tokio::fs::write(&artifact.path, bytes)
            .await
            .with_context(|| format!("写入临时截图失败: {}", artifact.path.display()))?;
        Ok(artifact)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("已删除临时截图: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("删除临时截图失败 {}: {}", self.path.display(), e),
        }
    }
}
