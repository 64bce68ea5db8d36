pub mod assembler;
pub mod orchestrator;
pub mod pipeline;
pub mod review;
pub mod types;

use std::sync::Arc;

use crate::app::AppConfig;
use crate::browser::{BrowserPool, SessionFactory};
use crate::capture::Capturer;
use crate::scoring::Scorer;
use crate::storage::{AuditStore, ObjectStore};

pub use orchestrator::analyze;
pub use review::review;
pub use types::{Outcome, ServiceError};

/// 各请求共享的只读配置和客户端
pub struct ServiceContext {
    pub config: AppConfig,
    pub pool: BrowserPool,
    pub capturer: Capturer,
    pub scorer: Arc<dyn Scorer>,
    pub audit: Arc<dyn AuditStore>,
}

impl ServiceContext {
    pub fn new(
        config: AppConfig,
        factory: Arc<dyn SessionFactory>,
        store: Arc<dyn ObjectStore>,
        scorer: Arc<dyn Scorer>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        let pool = BrowserPool::new(
            factory,
            config.server.max_sessions,
            std::time::Duration::from_millis(config.server.queue_timeout_ms),
        );
        let capturer = Capturer::new(
            store,
            config.storage.temp_dir(),
            config.storage.key_prefix.clone(),
        );
        Self {
            config,
            pool,
            capturer,
            scorer,
            audit,
        }
    }
}
