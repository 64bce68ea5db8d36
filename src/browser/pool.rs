use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, oneshot};
use tracing::{debug, warn};

use super::{BrowserSession, SessionFactory, SessionOptions};

#[derive(Debug, thiserror::Error)]
#[error("浏览器会话已满，排队 {waited_ms}ms 后仍无空位")]
pub struct PoolBusy {
    pub waited_ms: u64,
}

/// 浏览器会话池：用信号量限制同时打开的标签页数量，超出时排队，排队超时则拒绝
#[derive(Clone)]
pub struct BrowserPool {
    factory: Arc<dyn SessionFactory>,
    semaphore: Arc<Semaphore>,
    max_sessions: usize,
    queue_timeout: Duration,
}

impl BrowserPool {
    pub fn new(factory: Arc<dyn SessionFactory>, max_sessions: usize, queue_timeout: Duration) -> Self {
        let max_sessions = max_sessions.max(1);
        Self {
            factory,
            semaphore: Arc::new(Semaphore::new(max_sessions)),
            max_sessions,
            queue_timeout,
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn active_sessions(&self) -> usize {
        self.max_sessions - self.semaphore.available_permits()
    }

    /// 预留一个会话名额，排队超过 queue_timeout 返回 PoolBusy
    pub async fn reserve(&self) -> Result<Reservation, PoolBusy> {
        let waited_ms = self.queue_timeout.as_millis() as u64;
        let permit = tokio::time::timeout(self.queue_timeout, self.semaphore.clone().acquire_owned())
            .await
            .map_err(|_| {
                warn!("⚠️ 会话池已满 ({} 个)，拒绝请求", self.max_sessions);
                PoolBusy { waited_ms }
            })?
            .map_err(|_| PoolBusy { waited_ms })?;
        debug!("获得会话名额，当前占用 {}/{}", self.active_sessions(), self.max_sessions);

        Ok(Reservation {
            factory: self.factory.clone(),
            permit,
        })
    }
}

/// 已占用的名额，尚未打开浏览器
pub struct Reservation {
    factory: Arc<dyn SessionFactory>,
    permit: OwnedSemaphorePermit,
}

impl Reservation {
    /// 打开标签页并换成 Lease
    ///
    /// 打开过程放在独立任务里完成：调用方在等待时被中止，
    /// 新建的 Lease 发送失败后随即被丢弃，标签页照样关闭，名额在关闭后才归还。
    pub async fn open(self, options: SessionOptions) -> Result<Lease> {
        let Reservation { factory, permit } = self;
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let opened = factory.open(options).await.map(|session| Lease {
                session: Some(session),
                permit: Some(permit),
            });
            if tx.send(opened).is_err() {
                debug!("请求已放弃，关闭刚打开的标签页");
            }
        });
        rx.await.map_err(|_| anyhow!("打开浏览器会话的任务意外结束"))?
    }
}

/// 打开的会话连同名额；被丢弃时（包括任务被中止）在后台关闭标签页
pub struct Lease {
    session: Option<Box<dyn BrowserSession>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl Lease {
    pub fn session(&self) -> &dyn BrowserSession {
        self.session
            .as_deref()
            .expect("session is only taken by close or drop")
    }

    pub async fn close(mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!("关闭标签页失败: {}，但继续处理", e);
            }
        }
        self.permit.take();
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let permit = self.permit.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        debug!("后台关闭标签页失败: {}", e);
                    }
                    drop(permit);
                });
            }
            Err(_) => drop(permit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBrowser;

    #[tokio::test]
    async fn test_reserve_rejects_when_full() {
        let browser = FakeBrowser::new();
        let pool = BrowserPool::new(Arc::new(browser.clone()), 1, Duration::from_millis(50));

        let first = pool.reserve().await.expect("第一个名额应该成功");
        assert_eq!(pool.active_sessions(), 1);

        let second = pool.reserve().await;
        assert!(second.is_err(), "满员时应该拒绝");

        drop(first);
        assert!(pool.reserve().await.is_ok(), "释放后应该可以再次预留");
    }

    #[tokio::test]
    async fn test_dropped_lease_closes_session_in_background() {
        let browser = FakeBrowser::new();
        let pool = BrowserPool::new(Arc::new(browser.clone()), 2, Duration::from_millis(50));

        let lease = pool.reserve().await.unwrap().open(SessionOptions::default()).await.unwrap();
        assert_eq!(browser.opened(), 1);
        drop(lease);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(browser.closed(), 1, "丢弃 Lease 后标签页应被关闭");
        assert_eq!(pool.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_abort_while_opening_still_closes_tab() {
        let browser = FakeBrowser::new().with_open_delay(Duration::from_millis(50));
        let pool = BrowserPool::new(Arc::new(browser.clone()), 1, Duration::from_millis(50));

        let reservation = pool.reserve().await.unwrap();
        let task = tokio::spawn(async move { reservation.open(SessionOptions::default()).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        task.abort();
        assert_eq!(pool.active_sessions(), 1, "标签页打开前名额仍被占用");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(browser.opened(), 1);
        assert_eq!(browser.closed(), 1, "中止时正在打开的标签页应被关闭");
        assert_eq!(pool.active_sessions(), 0, "关闭后应归还名额");
    }

    #[tokio::test]
    async fn test_failed_open_releases_permit() {
        let pool = BrowserPool::new(
            Arc::new(crate::browser::UnavailableBrowser),
            1,
            Duration::from_millis(50),
        );
        let result = pool.reserve().await.unwrap().open(SessionOptions::default()).await;
        assert!(result.is_err());
        assert_eq!(pool.active_sessions(), 0);
    }
}
